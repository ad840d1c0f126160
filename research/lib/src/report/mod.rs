//! The structured literature report and the result of one analysis.
//!
//! ## Module Structure
//!
//! - [`types`]: report data model ([`ResearchReport`], [`ModelEntry`],
//!   [`NoveltyCheck`], [`AlternativeModel`]) and the analysis output
//!   ([`AnalysisResult`], [`SearchSource`]) plus the [`GroundingChunk`] citations
//!   a search-grounded response carries

pub mod types;

pub use types::{
    AlternativeModel, AnalysisResult, Frequency, GroundingChunk, ModelEntry, NoveltyCheck,
    ResearchReport, SearchSource, WebReference, is_http_link,
};
