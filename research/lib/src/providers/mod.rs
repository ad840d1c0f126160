//! Generative AI service clients.

pub mod gemini;
