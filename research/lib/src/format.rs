//! Output formatting for analysis results.
//!
//! Three renderings of the same [`AnalysisResult`]:
//! - [`format_json`]: pretty JSON, camelCase field names
//! - [`format_markdown`]: a standalone markdown document
//! - [`format_terminal`]: colored output for interactive use
//!
//! Models without a direct paper link are linked to a Google Scholar search
//! instead. These search links are presentation only and never become part
//! of the result's sources.

use crate::report::{AnalysisResult, ModelEntry, NoveltyCheck, ResearchReport, SearchSource};
use owo_colors::OwoColorize;
use std::fmt::Write;

const SCHOLAR_SEARCH_URL: &str = "https://scholar.google.com/scholar?q=";

/// Notice shown above the raw text when no report could be parsed.
pub const RAW_FALLBACK_NOTICE: &str =
    "The response could not be parsed into a structured report. Showing the raw answer instead.";

/// Disclaimer shown above every structured report.
pub const AI_CONTENT_NOTICE: &str =
    "AI-Generated Content: please independently verify all citations and paper links.";

/// Formats the whole result as pretty-printed JSON.
pub fn format_json(result: &AnalysisResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}

/// Google Scholar search URL for a free-text query.
///
/// ## Examples
///
/// ```
/// use paperai_lib::format::scholar_search_url;
///
/// assert_eq!(
///     scholar_search_url("\"Attention Is All You Need\""),
///     "https://scholar.google.com/scholar?q=%22Attention+Is+All+You+Need%22"
/// );
/// ```
pub fn scholar_search_url(query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("{SCHOLAR_SEARCH_URL}{encoded}")
}

/// Where a model's "paper" link should point.
///
/// The direct link when there is one; otherwise a Scholar search for the
/// quoted paper title, or for the model name and category.
pub fn model_link(model: &ModelEntry) -> String {
    if let Some(link) = model.http_link() {
        return link.to_string();
    }
    match &model.paper_title {
        Some(title) => scholar_search_url(&format!("\"{title}\"")),
        None => scholar_search_url(&format!("{} {} original paper", model.name, model.category)),
    }
}

/// Link text for a model's paper.
fn model_link_text(model: &ModelEntry) -> &str {
    model
        .paper_title
        .as_deref()
        .or(model.citation.as_deref())
        .unwrap_or("View Research Paper")
}

/// Where the novelty evidence should point, if anywhere.
pub fn evidence_link(novelty: &NoveltyCheck) -> Option<String> {
    novelty
        .http_link()
        .map(str::to_string)
        .or_else(|| novelty.evidence_title.as_deref().map(scholar_search_url))
}

fn has_score(model: &ModelEntry) -> bool {
    model
        .score
        .as_deref()
        .is_some_and(|s| !s.eq_ignore_ascii_case("n/a"))
}

/// Source title, else the URI's host name, else the URI itself.
fn source_label(source: &SearchSource) -> String {
    if let Some(title) = &source.title {
        return title.clone();
    }
    url::Url::parse(&source.uri)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| source.uri.clone())
}

/// Formats the result as a markdown document.
///
/// When no report is present the raw text is reproduced verbatim in a code
/// block, preceded by [`RAW_FALLBACK_NOTICE`].
pub fn format_markdown(topic: &str, result: &AnalysisResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Literature Analysis: {topic}\n");

    match &result.report {
        Some(report) => {
            let _ = writeln!(out, "> {AI_CONTENT_NOTICE}\n");
            write_report_markdown(&mut out, report);
        }
        None => {
            let _ = writeln!(out, "> {RAW_FALLBACK_NOTICE}\n");
            let _ = writeln!(out, "```text\n{}\n```\n", result.raw_text.as_deref().unwrap_or(""));
        }
    }

    if !result.sources.is_empty() {
        let _ = writeln!(out, "## Sources\n");
        for (i, source) in result.sources.iter().enumerate() {
            let _ = writeln!(out, "{}. [{}]({})", i + 1, source_label(source), source.uri);
        }
        out.push('\n');
    }

    out.trim_end().to_string() + "\n"
}

fn write_report_markdown(out: &mut String, report: &ResearchReport) {
    let _ = writeln!(out, "## Overview\n\n{}\n", report.topic_overview);

    if !report.models_found.is_empty() {
        let _ = writeln!(out, "## Models Found\n");
        for (i, model) in report.models_by_frequency().into_iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. **{}** ({}, {} frequency)",
                i + 1,
                model.name,
                model.category,
                model.frequency
            );
            if has_score(model)
                && let Some(score) = &model.score
            {
                let _ = writeln!(out, "   - Score: {score}");
            }
            if !model.notes.is_empty() {
                let _ = writeln!(out, "   - {}", model.notes);
            }
            if let Some(citation) = &model.citation {
                let _ = writeln!(out, "   - Citation: {citation}");
            }
            let _ = writeln!(
                out,
                "   - Paper: [{}]({})",
                model_link_text(model),
                model_link(model)
            );
        }
        out.push('\n');
    }

    let novelty = &report.novelty_check;
    let verdict = if novelty.is_used {
        "Already explored"
    } else {
        "Novel"
    };
    let _ = writeln!(out, "## Novelty Check\n\n**{verdict}**: {}\n", novelty.summary);
    if let Some(details) = &novelty.details {
        let _ = writeln!(out, "{details}\n");
    }
    if let Some(link) = evidence_link(novelty) {
        let title = novelty.evidence_title.as_deref().unwrap_or("Related work");
        let _ = writeln!(out, "Evidence: [{title}]({link})\n");
    }

    if !report.insights.is_empty() {
        let _ = writeln!(out, "## Insights\n");
        for insight in &report.insights {
            let _ = writeln!(out, "- {insight}");
        }
        out.push('\n');
    }

    if !report.recommended_alternatives.is_empty() {
        let _ = writeln!(out, "## Recommended Alternatives\n");
        for alt in &report.recommended_alternatives {
            let _ = writeln!(out, "- **{}**: {}", alt.name, alt.reason);
        }
        out.push('\n');
    }
}

/// Formats the result for terminal display with colored output.
///
/// - **BOLD**: section headings and model names
/// - **GREEN**: a novel proposal, **YELLOW**: already explored
/// - **DIMMED**: links and secondary detail
pub fn format_terminal(topic: &str, result: &AnalysisResult) -> String {
    let mut lines = vec![format!("{} {}", "Literature Analysis:".bold(), topic.bold())];

    match &result.report {
        Some(report) => {
            lines.push(String::new());
            lines.push(AI_CONTENT_NOTICE.yellow().to_string());
            lines.extend(terminal_report_lines(report));
        }
        None => {
            lines.push(String::new());
            lines.push(RAW_FALLBACK_NOTICE.yellow().to_string());
            lines.push(String::new());
            lines.push(result.raw_text.clone().unwrap_or_default());
        }
    }

    if !result.sources.is_empty() {
        lines.push(String::new());
        lines.push("Sources".bold().underline().to_string());
        for source in &result.sources {
            lines.push(format!(
                "- {} {}",
                source_label(source),
                source.uri.dimmed()
            ));
        }
    }

    lines.join("\n")
}

fn terminal_report_lines(report: &ResearchReport) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        "Overview".bold().underline().to_string(),
        report.topic_overview.clone(),
    ];

    if !report.models_found.is_empty() {
        lines.push(String::new());
        lines.push("Models Found".bold().underline().to_string());
        for (i, model) in report.models_by_frequency().into_iter().enumerate() {
            let mut line = format!(
                "{:>2}. {} [{}] {}",
                i + 1,
                model.name.bold(),
                model.category,
                model.frequency.to_string().dimmed()
            );
            if has_score(model)
                && let Some(score) = &model.score
            {
                line.push_str(&format!(" {}", score.cyan()));
            }
            lines.push(line);
            if !model.notes.is_empty() {
                lines.push(format!("    {}", model.notes));
            }
            lines.push(format!(
                "    {} {}",
                model_link_text(model),
                model_link(model).dimmed()
            ));
        }
    }

    let novelty = &report.novelty_check;
    lines.push(String::new());
    lines.push("Novelty Check".bold().underline().to_string());
    let verdict = if novelty.is_used {
        "Already explored".yellow().bold().to_string()
    } else {
        "Novel".green().bold().to_string()
    };
    lines.push(format!("{verdict}: {}", novelty.summary));
    if let Some(details) = &novelty.details {
        lines.push(details.clone());
    }
    if let Some(link) = evidence_link(novelty) {
        let title = novelty.evidence_title.as_deref().unwrap_or("Related work");
        lines.push(format!("Evidence: {title} {}", link.dimmed()));
    }

    if !report.insights.is_empty() {
        lines.push(String::new());
        lines.push("Insights".bold().underline().to_string());
        lines.extend(report.insights.iter().map(|i| format!("- {i}")));
    }

    if !report.recommended_alternatives.is_empty() {
        lines.push(String::new());
        lines.push("Recommended Alternatives".bold().underline().to_string());
        lines.extend(
            report
                .recommended_alternatives
                .iter()
                .map(|a| format!("- {}: {}", a.name.bold(), a.reason)),
        );
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::report::GroundingChunk;

    const REPORT: &str = r#"{
        "topicOverview": "Segmentation of medical images.",
        "modelsFound": [
            {"name": "SAM", "category": "Foundation", "frequency": "Low", "score": "N/A",
             "notes": "Promptable.", "paperTitle": "Segment Anything"},
            {"name": "U-Net", "category": "CNN", "frequency": "High", "score": "Dice 0.92",
             "notes": "Encoder-decoder.", "citation": "Ronneberger et al., 2015",
             "paperTitle": "U-Net: Convolutional Networks for Biomedical Image Segmentation",
             "paperLink": "https://arxiv.org/abs/1505.04597"},
            {"name": "nnU-Net", "category": "CNN", "frequency": "Medium", "notes": ""}
        ],
        "noveltyCheck": {"isUsed": false, "summary": "No prior use found",
                         "evidenceTitle": "TransUNet"},
        "insights": ["Transformers hybridize with CNNs"],
        "recommendedAlternatives": [{"name": "Swin-UNet", "reason": "Global context"}]
    }"#;

    fn result() -> AnalysisResult {
        normalize(
            REPORT,
            &[GroundingChunk::web("https://grounded.example", Some("Grounded"))],
        )
    }

    #[test]
    fn test_scholar_search_url_encodes_query() {
        let url = scholar_search_url("a&b c");
        assert_eq!(url, "https://scholar.google.com/scholar?q=a%26b+c");
    }

    #[test]
    fn test_model_link_prefers_direct_link() {
        let report = result().report.unwrap();
        let unet = report.models_found.iter().find(|m| m.name == "U-Net").unwrap();
        assert_eq!(model_link(unet), "https://arxiv.org/abs/1505.04597");
    }

    #[test]
    fn test_model_link_searches_quoted_title() {
        let report = result().report.unwrap();
        let sam = report.models_found.iter().find(|m| m.name == "SAM").unwrap();
        assert_eq!(
            model_link(sam),
            scholar_search_url("\"Segment Anything\"")
        );
    }

    #[test]
    fn test_model_link_searches_name_and_category() {
        let report = result().report.unwrap();
        let nnunet = report.models_found.iter().find(|m| m.name == "nnU-Net").unwrap();
        assert_eq!(
            model_link(nnunet),
            scholar_search_url("nnU-Net CNN original paper")
        );
    }

    #[test]
    fn test_evidence_link_falls_back_to_title_search() {
        let report = result().report.unwrap();
        assert_eq!(
            evidence_link(&report.novelty_check),
            Some(scholar_search_url("TransUNet"))
        );
    }

    #[test]
    fn test_search_links_do_not_become_sources() {
        let result = result();
        assert!(
            result
                .sources
                .iter()
                .all(|s| !s.uri.starts_with(SCHOLAR_SEARCH_URL))
        );
    }

    #[test]
    fn test_format_markdown_orders_models_by_frequency() {
        let md = format_markdown("segmentation", &result());
        let unet = md.find("**U-Net**").unwrap();
        let nnunet = md.find("**nnU-Net**").unwrap();
        let sam = md.find("**SAM**").unwrap();
        assert!(unet < nnunet && nnunet < sam);
    }

    #[test]
    fn test_format_markdown_sections() {
        let md = format_markdown("segmentation", &result());
        assert!(md.starts_with("# Literature Analysis: segmentation"));
        assert!(md.contains("## Overview\n\nSegmentation of medical images."));
        assert!(md.contains("**Novel**: No prior use found"));
        assert!(md.contains("- Score: Dice 0.92"));
        assert!(!md.contains("Score: N/A"));
        assert!(md.contains("- **Swin-UNet**: Global context"));
        assert!(md.contains("1. [Grounded](https://grounded.example)"));
        assert!(md.ends_with('\n'));
    }

    #[test]
    fn test_format_markdown_raw_fallback() {
        let result = normalize("The model refused to answer.", &[]);
        let md = format_markdown("t", &result);
        assert!(md.contains(RAW_FALLBACK_NOTICE));
        assert!(md.contains("The model refused to answer."));
        assert!(!md.contains("## Sources"));
    }

    #[test]
    fn test_format_json_round_trips() {
        let result = result();
        let json = format_json(&result).unwrap();
        let back: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_format_terminal_contains_content() {
        let out = format_terminal("segmentation", &result());
        assert!(out.contains("U-Net"));
        assert!(out.contains("No prior use found"));
        assert!(out.contains("https://grounded.example"));
    }

    #[test]
    fn test_format_terminal_raw_fallback() {
        let out = format_terminal("t", &normalize("plain words", &[]));
        assert!(out.contains("plain words"));
        assert!(out.contains(RAW_FALLBACK_NOTICE));
        assert!(!out.contains(AI_CONTENT_NOTICE));
    }

    #[test]
    fn test_report_carries_ai_content_notice() {
        let md = format_markdown("segmentation", &result());
        let notice = md.find(AI_CONTENT_NOTICE).expect("markdown notice");
        assert!(notice < md.find("## Overview").unwrap());

        let out = format_terminal("segmentation", &result());
        assert!(out.contains(AI_CONTENT_NOTICE));

        let raw = format_markdown("t", &normalize("plain words", &[]));
        assert!(!raw.contains(AI_CONTENT_NOTICE));
    }

    #[test]
    fn test_untitled_source_is_labelled_by_host() {
        let result = normalize(
            "no report",
            &[
                GroundingChunk::web("https://www.nature.com/articles/s41586", None),
                GroundingChunk::web("http//not a url", None),
            ],
        );
        let md = format_markdown("t", &result);
        assert!(md.contains("1. [www.nature.com](https://www.nature.com/articles/s41586)"));
        assert!(md.contains("2. [http//not a url](http//not a url)"));

        let out = format_terminal("t", &result);
        assert!(out.contains("- www.nature.com "));
    }
}
