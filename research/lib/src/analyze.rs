//! Request orchestration for a literature analysis.
//!
//! One call to [`Analyzer::analyze`] sends exactly one search-grounded request
//! and normalizes whatever comes back. There are no retries: configuration
//! and service errors surface to the caller, while an unparseable answer is
//! absorbed into an [`AnalysisResult`] without a report.

use crate::normalize::normalize;
use crate::providers::gemini::{GeminiClient, GeminiConfig, GeminiError};
use crate::report::AnalysisResult;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, instrument};

/// Embedded prompt templates
mod prompts {
    pub const ANALYSIS: &str = include_str!("../prompts/analysis.md");
}

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(topic|model)\}\}").expect("placeholder regex should compile")
});

/// Label used in the prompt when no proposed model is given.
pub const GENERAL_SURVEY: &str = "General survey";

/// Raw text used when the service answers without any text part.
pub const EMPTY_RESPONSE_TEXT: &str = "{}";

/// Errors that abort an analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Credential missing or settings invalid; raised before any request
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The service call failed (network, auth, quota, rate limit, bad envelope)
    #[error("Service request failed: {0}")]
    Service(#[source] GeminiError),
}

impl AnalysisError {
    /// Message suitable for an end user.
    ///
    /// Configuration problems are actionable and are spelled out. Service
    /// failures stay generic; their details only go to the log.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(detail) => format!(
                "{detail}. Please check your environment configuration (GEMINI_API_KEY)."
            ),
            Self::Service(_) => {
                "An error occurred while analyzing the literature. Please try again later."
                    .to_string()
            }
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<GeminiError> for AnalysisError {
    fn from(err: GeminiError) -> Self {
        if err.is_config() {
            Self::Configuration(err.to_string())
        } else {
            Self::Service(err)
        }
    }
}

/// Fill the analysis prompt for a topic and an optional proposed model.
///
/// An empty (or whitespace-only) proposed model becomes [`GENERAL_SURVEY`].
///
/// ## Examples
///
/// ```
/// use paperai_lib::analyze::build_prompt;
///
/// let prompt = build_prompt("traffic forecasting", "");
/// assert!(prompt.contains("Research Topic: \"traffic forecasting\""));
/// assert!(prompt.contains("Proposed Model: \"General survey\""));
/// ```
pub fn build_prompt(topic: &str, proposed_model: &str) -> String {
    let model = match proposed_model.trim() {
        "" => GENERAL_SURVEY,
        m => m,
    };

    // Single pass so placeholder text inside the inputs is left alone
    PLACEHOLDER_RE
        .replace_all(prompts::ANALYSIS, |caps: &Captures| match &caps[1] {
            "topic" => topic,
            _ => model,
        })
        .into_owned()
}

/// Runs literature analyses against Gemini.
///
/// Holds only immutable configuration, so it can be cloned and shared freely.
/// Each analysis is independent of every other one.
#[derive(Debug, Clone)]
pub struct Analyzer {
    client: GeminiClient,
}

impl Analyzer {
    /// Create an analyzer, validating the configuration up front.
    pub fn new(config: GeminiConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            client: GeminiClient::new(config),
        })
    }

    /// Create an analyzer from environment variables.
    ///
    /// ## Errors
    ///
    /// Returns `AnalysisError::Configuration` when no API key is set.
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn config(&self) -> &GeminiConfig {
        self.client.config()
    }

    /// Analyze a research topic.
    ///
    /// `topic` is expected to be non-empty; callers enforce this. An empty
    /// `proposed_model` asks for a general survey of the topic.
    ///
    /// ## Errors
    ///
    /// - `AnalysisError::Service` - the request failed; it is not retried
    ///
    /// A response that cannot be parsed into a report is not an error: the
    /// result has `report: None` and carries the raw text.
    #[instrument(
        name = "analyze",
        skip(self),
        fields(model_id = %self.client.config().model, otel.kind = "client")
    )]
    pub async fn analyze(
        &self,
        topic: &str,
        proposed_model: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let start = Instant::now();
        let prompt = build_prompt(topic, proposed_model);

        let response = match self.client.generate_grounded_json(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Gemini API error");
                return Err(e.into());
            }
        };

        let raw_text = response
            .text
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| EMPTY_RESPONSE_TEXT.to_string());
        let result = normalize(&raw_text, &response.grounding_chunks);

        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            has_report = result.has_report(),
            models = result.report.as_ref().map_or(0, |r| r.models_found.len()),
            sources = result.sources.len(),
            "Analysis completed"
        );

        Ok(result)
    }
}

/// Analyze a topic using configuration from the environment.
///
/// The credential is checked before anything is sent; a missing key fails
/// with `AnalysisError::Configuration`.
///
/// ## Examples
///
/// ```rust,no_run
/// # async fn example() -> Result<(), paperai_lib::AnalysisError> {
/// let result = paperai_lib::analyze("graph neural networks for traffic", "ST-GNN").await?;
/// if let Some(report) = &result.report {
///     println!("{}", report.topic_overview);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn analyze(topic: &str, proposed_model: &str) -> Result<AnalysisResult, AnalysisError> {
    Analyzer::from_env()?.analyze(topic, proposed_model).await
}
