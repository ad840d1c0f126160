//! Source aggregation and deduplication.
//!
//! Sources come from two places: the grounding chunks the service attaches to
//! a search-grounded response, and the paper/evidence links inside the report
//! itself. They are merged into one list keyed on the exact URI string.
//!
//! ## Precedence
//!
//! The first occurrence of a URI wins. Grounding chunks are added before any
//! report link, so a grounding title is kept over a paper title for the same
//! URI. URIs are compared verbatim; no trailing-slash, scheme-case or query
//! normalization is applied.

use crate::report::{GroundingChunk, ResearchReport, SearchSource};
use std::collections::HashSet;

/// An insertion-ordered list of sources, unique on `uri`.
#[derive(Debug, Default, Clone)]
pub struct SourceList {
    sources: Vec<SearchSource>,
    seen: HashSet<String>,
}

impl SourceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source unless its URI is empty or already present.
    ///
    /// Returns `true` when the source was added.
    pub fn push(&mut self, uri: &str, title: Option<String>) -> bool {
        if uri.is_empty() || self.seen.contains(uri) {
            return false;
        }
        self.seen.insert(uri.to_string());
        self.sources.push(SearchSource::new(uri, title));
        true
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.seen.contains(uri)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Adds every grounding chunk with a non-empty web URI, in chunk order.
    pub fn extend_from_grounding(&mut self, chunks: &[GroundingChunk]) {
        for chunk in chunks {
            if let Some(web) = &chunk.web
                && let Some(uri) = web.uri.as_deref()
            {
                self.push(uri, web.title.clone());
            }
        }
    }

    /// Adds the `http` links embedded in a report.
    ///
    /// Model paper links come first, titled by paper title or model name, then
    /// the novelty evidence link titled by the evidence title.
    pub fn extend_from_report(&mut self, report: &ResearchReport) {
        for model in &report.models_found {
            if let Some(link) = model.http_link() {
                self.push(link, Some(model.display_title().to_string()));
            }
        }

        let novelty = &report.novelty_check;
        if let Some(link) = novelty.http_link() {
            self.push(link, novelty.evidence_title.clone());
        }
    }

    pub fn into_vec(self) -> Vec<SearchSource> {
        self.sources
    }
}

/// Merges grounding chunks and report links into one deduplicated list.
///
/// ## Examples
///
/// ```
/// use paperai_lib::normalize::collect_sources;
/// use paperai_lib::report::GroundingChunk;
///
/// let chunks = vec![
///     GroundingChunk::web("https://a.example", Some("A")),
///     GroundingChunk::web("https://a.example", Some("A again")),
///     GroundingChunk::default(),
/// ];
/// let sources = collect_sources(&chunks, None);
/// assert_eq!(sources.len(), 1);
/// assert_eq!(sources[0].title.as_deref(), Some("A"));
/// ```
pub fn collect_sources(
    chunks: &[GroundingChunk],
    report: Option<&ResearchReport>,
) -> Vec<SearchSource> {
    let mut sources = SourceList::new();
    sources.extend_from_grounding(chunks);
    if let Some(report) = report {
        sources.extend_from_report(report);
    }
    sources.into_vec()
}
