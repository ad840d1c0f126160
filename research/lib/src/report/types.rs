//! Core types for a literature analysis.
//!
//! These structures mirror the JSON document the model is asked to produce.
//! Field names on the wire are camelCase (`topicOverview`, `paperLink`, ...)
//! so the same types can be handed to any JSON-speaking renderer.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// How often a model shows up in the literature for the topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    High,
    Medium,
    Low,
}

impl Frequency {
    /// Sort weight, higher means more prominent.
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    /// Parse a frequency label, ignoring case and surrounding whitespace.
    ///
    /// ## Examples
    ///
    /// ```
    /// use paperai_lib::report::Frequency;
    ///
    /// assert_eq!("High".parse::<Frequency>().unwrap(), Frequency::High);
    /// assert_eq!(" medium ".parse::<Frequency>().unwrap(), Frequency::Medium);
    /// assert!("often".parse::<Frequency>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown frequency: {other}")),
        }
    }
}

impl Serialize for Frequency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Frequency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}

/// Optional strings treat `null`, `""` and whitespace-only values as absent.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

/// Like [`empty_as_none`], but numbers are also accepted and kept as their
/// JSON text (`0.92` becomes `"0.92"`).
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<TextOrNumber>::deserialize(deserializer)?;
    Ok(value
        .map(|v| match v {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Number(n) => n.to_string(),
        })
        .filter(|s| !s.trim().is_empty()))
}

/// Returns true when `link` can be used as a source URI.
///
/// Only values starting with `http` qualify; an empty string never does.
pub fn is_http_link(link: &str) -> bool {
    link.starts_with("http")
}

/// One research artifact (architecture, method or paper) found for the topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    pub name: String,
    /// Taxonomy bucket, e.g. "Graph Learning"
    pub category: String,
    pub frequency: Frequency,
    /// Free-form metric such as "98.5% Accuracy", or "N/A"
    #[serde(default, deserialize_with = "text_or_number", skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    pub notes: String,
    /// e.g. "Smith et al., 2023"
    #[serde(default, deserialize_with = "text_or_number", skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub paper_title: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub paper_link: Option<String>,
}

impl ModelEntry {
    /// The direct paper link, if it is usable as a source.
    pub fn http_link(&self) -> Option<&str> {
        self.paper_link.as_deref().filter(|l| is_http_link(l))
    }

    /// Title to show for this entry's paper: the paper title, else the model name.
    pub fn display_title(&self) -> &str {
        self.paper_title.as_deref().unwrap_or(&self.name)
    }
}

/// Verdict on whether the proposed model is already used for the topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoveltyCheck {
    pub is_used: bool,
    pub summary: String,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub evidence_title: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub evidence_link: Option<String>,
}

impl NoveltyCheck {
    pub fn http_link(&self) -> Option<&str> {
        self.evidence_link.as_deref().filter(|l| is_http_link(l))
    }
}

/// A recommended substitute architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeModel {
    pub name: String,
    pub reason: String,
}

/// The structured literature review.
///
/// A report is all-or-nothing: if any required field is missing or has the
/// wrong shape, deserialization fails and no report exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchReport {
    pub topic_overview: String,
    pub models_found: Vec<ModelEntry>,
    pub novelty_check: NoveltyCheck,
    pub insights: Vec<String>,
    pub recommended_alternatives: Vec<AlternativeModel>,
}

impl ResearchReport {
    /// Models ordered High → Medium → Low, keeping the model's order within a tier.
    pub fn models_by_frequency(&self) -> Vec<&ModelEntry> {
        let mut models: Vec<&ModelEntry> = self.models_found.iter().collect();
        models.sort_by(|a, b| b.frequency.rank().cmp(&a.frequency.rank()));
        models
    }
}

/// A cited reference: a URI plus an optional title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub uri: String,
}

impl SearchSource {
    pub fn new(uri: impl Into<String>, title: Option<String>) -> Self {
        Self {
            title,
            uri: uri.into(),
        }
    }
}

/// A citation attached to a search-grounded response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<WebReference>,
}

/// The web page behind a [`GroundingChunk`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl GroundingChunk {
    /// Convenience constructor for a web chunk.
    pub fn web(uri: impl Into<String>, title: Option<&str>) -> Self {
        Self {
            web: Some(WebReference {
                uri: Some(uri.into()),
                title: title.map(str::to_string),
            }),
        }
    }
}

/// Outcome of one analysis.
///
/// `report` is `None` when the model's answer could not be parsed; `raw_text`
/// then still carries the answer verbatim so something can be shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub report: Option<ResearchReport>,
    pub sources: Vec<SearchSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl AnalysisResult {
    pub fn has_report(&self) -> bool {
        self.report.is_some()
    }
}
