//! Turns a raw model response into an [`AnalysisResult`].
//!
//! ## Pipeline
//!
//! 1. **Extraction**: take the first-`{`-to-last-`}` span, or strip markdown
//!    fences when there is no such span ([`extract_json_candidate`])
//! 2. **Strict parse**: untyped JSON first, then the typed [`ResearchReport`]
//! 3. **Repair**: on failure drop trailing commas and retry once
//!    ([`repair_trailing_commas`]); a second failure leaves the report empty
//! 4. **Sources**: grounding chunks, then report links, deduplicated on the
//!    exact URI ([`collect_sources`])
//!
//! A parse failure is never an error. The caller always gets the raw text
//! back and can show it verbatim when no report could be built.
//!
//! ## Module Structure
//!
//! - [`extract`]: JSON candidate extraction and trailing-comma repair
//! - [`sources`]: source aggregation and deduplication

pub mod extract;
pub mod sources;

pub use extract::{LenientParseError, extract_json_candidate, parse_lenient, repair_trailing_commas};
pub use sources::{SourceList, collect_sources};

use crate::report::{AnalysisResult, GroundingChunk, ResearchReport};
use tracing::{debug, warn};

/// Maximum number of characters of raw text included in diagnostics.
const RAW_PREVIEW_CHARS: usize = 500;

/// Parses a report out of raw model output.
///
/// Returns `None` when neither the extracted candidate nor its repaired form
/// is a complete [`ResearchReport`]. The failure is logged and otherwise
/// absorbed.
pub fn parse_report(raw_text: &str) -> Option<ResearchReport> {
    let candidate = extract_json_candidate(raw_text);

    match parse_lenient::<ResearchReport>(&candidate) {
        Ok(report) => Some(report),
        Err(err) => {
            let preview: String = raw_text.chars().take(RAW_PREVIEW_CHARS).collect();
            warn!(
                strict_error = %err.strict,
                repaired_error = %err.repaired,
                raw_len = raw_text.len(),
                raw_truncated = raw_text.chars().count() > RAW_PREVIEW_CHARS,
                raw_preview = %preview,
                "JSON parsing failed, falling back to raw text"
            );
            None
        }
    }
}

/// Builds the analysis result for one response.
///
/// `raw_text` is kept verbatim in the result regardless of whether a report
/// could be parsed.
///
/// ## Examples
///
/// ```
/// use paperai_lib::normalize::normalize;
///
/// let raw = r#"Sure! Here is the result: {"topicOverview":"X","modelsFound":[],
///     "noveltyCheck":{"isUsed":false,"summary":"Novel"},"insights":[],
///     "recommendedAlternatives":[]}"#;
/// let result = normalize(raw, &[]);
///
/// assert_eq!(result.report.unwrap().topic_overview, "X");
/// assert!(result.sources.is_empty());
/// ```
pub fn normalize(raw_text: &str, grounding_chunks: &[GroundingChunk]) -> AnalysisResult {
    let report = parse_report(raw_text);
    let sources = collect_sources(grounding_chunks, report.as_ref());

    debug!(
        has_report = report.is_some(),
        grounding_chunks = grounding_chunks.len(),
        sources = sources.len(),
        "Normalized model response"
    );

    AnalysisResult {
        report,
        sources,
        raw_text: Some(raw_text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Frequency;

    const SCENARIO: &str = r#"Sure! Here is the result: {"topicOverview":"X","modelsFound":[],"noveltyCheck":{"isUsed":false,"summary":"Novel"},"insights":[],"recommendedAlternatives":[]}"#;

    fn full_report_json() -> String {
        r#"```json
{
  "topicOverview": "Traffic forecasting with graph models.",
  "modelsFound": [
    {
      "name": "DCRNN",
      "category": "Graph Learning",
      "frequency": "High",
      "score": "MAE 2.77",
      "notes": "Diffusion convolution inside a GRU.",
      "citation": "Li et al., 2018",
      "paperTitle": "Diffusion Convolutional Recurrent Neural Network",
      "paperLink": "https://arxiv.org/abs/1707.01926",
    },
    {
      "name": "ARIMA",
      "category": "Classical",
      "frequency": "Low",
      "score": "N/A",
      "notes": "Baseline.",
      "paperLink": ""
    },
  ],
  "noveltyCheck": {
    "isUsed": true,
    "summary": "Already explored",
    "details": "Several works apply it.",
    "evidenceTitle": "Graph WaveNet",
    "evidenceLink": "https://arxiv.org/abs/1906.00121"
  },
  "insights": ["Graphs dominate", "Transformers are rising",],
  "recommendedAlternatives": [
    { "name": "STAEformer", "reason": "Better long-range modelling" }
  ]
}
```"#
            .to_string()
    }

    #[test]
    fn prose_wrapped_scenario_parses() {
        let result = normalize(SCENARIO, &[]);
        let report = result.report.expect("report should parse");
        assert_eq!(report.topic_overview, "X");
        assert!(!report.novelty_check.is_used);
        assert!(result.sources.is_empty());
        assert_eq!(result.raw_text.as_deref(), Some(SCENARIO));
    }

    #[test]
    fn numeric_score_keeps_report_and_its_link() {
        let raw = r#"{"topicOverview":"T","modelsFound":[{"name":"M","category":"C","frequency":"High","score":0.92,"notes":"n","paperLink":"https://a"}],"noveltyCheck":{"isUsed":false,"summary":"s"},"insights":[],"recommendedAlternatives":[]}"#;
        let result = normalize(raw, &[]);

        let report = result.report.expect("numeric score should not reject the report");
        assert_eq!(report.models_found[0].score.as_deref(), Some("0.92"));
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].uri, "https://a");
    }

    #[test]
    fn fenced_report_with_trailing_commas_parses_after_repair() {
        let raw = full_report_json();
        let result = normalize(&raw, &[]);
        let report = result.report.expect("repaired report should parse");

        assert_eq!(report.models_found.len(), 2);
        assert_eq!(report.models_found[0].frequency, Frequency::High);
        assert!(report.models_found[1].paper_link.is_none());
        assert_eq!(report.insights.len(), 2);

        let uris: Vec<&str> = result.sources.iter().map(|s| s.uri.as_str()).collect();
        assert_eq!(
            uris,
            vec![
                "https://arxiv.org/abs/1707.01926",
                "https://arxiv.org/abs/1906.00121"
            ]
        );
        assert_eq!(
            result.sources[0].title.as_deref(),
            Some("Diffusion Convolutional Recurrent Neural Network")
        );
        assert_eq!(result.sources[1].title.as_deref(), Some("Graph WaveNet"));
    }

    #[test]
    fn grounding_precedes_report_links() {
        let chunks = vec![
            GroundingChunk::web("https://grounded.example", Some("Grounded")),
            GroundingChunk::web("https://arxiv.org/abs/1906.00121", Some("From search")),
        ];
        let result = normalize(&full_report_json(), &chunks);

        let titles: Vec<Option<&str>> =
            result.sources.iter().map(|s| s.title.as_deref()).collect();
        assert_eq!(
            titles,
            vec![
                Some("Grounded"),
                Some("From search"),
                Some("Diffusion Convolutional Recurrent Neural Network"),
            ]
        );
    }

    #[test]
    fn unparseable_text_keeps_raw_text_unmodified() {
        let raw = "I could not find anything { really, sorry,, }";
        let chunks = vec![GroundingChunk::web("https://search.example", None)];
        let result = normalize(raw, &chunks);

        assert!(result.report.is_none());
        assert_eq!(result.raw_text.as_deref(), Some(raw));
        assert_eq!(result.sources.len(), 1);
    }

    #[test]
    fn incomplete_report_is_rejected_entirely() {
        let raw = r#"{"topicOverview":"X","modelsFound":[],"insights":[],"recommendedAlternatives":[]}"#;
        let result = normalize(raw, &[]);
        assert!(result.report.is_none());
    }

    #[test]
    fn empty_text_yields_no_report() {
        let result = normalize("", &[GroundingChunk::web("https://a", None)]);
        assert!(result.report.is_none());
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.raw_text.as_deref(), Some(""));
    }

    #[test]
    fn empty_object_yields_no_report() {
        let result = normalize("{}", &[]);
        assert!(result.report.is_none());
        assert!(result.sources.is_empty());
        assert_eq!(result.raw_text.as_deref(), Some("{}"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn parse_failure_is_logged() {
        let _ = normalize("not json at all", &[]);
        assert!(logs_contain("JSON parsing failed"));
        assert!(logs_contain("not json at all"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn successful_parse_logs_no_warning() {
        let _ = normalize(SCENARIO, &[]);
        assert!(!logs_contain("JSON parsing failed"));
    }
}
