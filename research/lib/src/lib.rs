//! PaperAI Library - Search-grounded literature analysis
//!
//! This library asks a generative model (Google Gemini with Google Search
//! grounding) for a literature review of a research topic, then turns the
//! loosely-structured answer into a typed [`AnalysisResult`].
//!
//! ## Flow
//!
//! 1. [`Analyzer::analyze`] builds the prompt and sends one grounded request
//! 2. [`normalize::normalize`] extracts and repairs the JSON, parses the
//!    [`ResearchReport`](report::ResearchReport), and merges grounding sources
//!    with the report's own links
//! 3. [`format`] renders the result as JSON, markdown or colored terminal text
//!
//! Configuration and service failures are errors ([`AnalysisError`]). A
//! response that cannot be parsed is not: the result then has no report and
//! carries the raw text instead.
//!
//! ## Examples
//!
//! ```
//! use paperai_lib::normalize::normalize;
//! use paperai_lib::report::GroundingChunk;
//!
//! let raw = r#"Here is the review:
//! {"topicOverview": "X", "modelsFound": [], "insights": [],
//!  "noveltyCheck": {"isUsed": false, "summary": "Novel"},
//!  "recommendedAlternatives": [],}"#;
//! let chunks = [GroundingChunk::web("https://example.org/paper", Some("Paper"))];
//!
//! let result = normalize(raw, &chunks);
//! assert_eq!(result.report.unwrap().topic_overview, "X");
//! assert_eq!(result.sources.len(), 1);
//! ```

pub mod analyze;
pub mod format;
pub mod normalize;
pub mod providers;
pub mod report;

pub use analyze::{AnalysisError, Analyzer, analyze};
pub use report::AnalysisResult;
