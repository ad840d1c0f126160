//! Google Gemini client for search-grounded JSON generation.
//!
//! Talks to the `generateContent` REST endpoint with Google Search grounding
//! enabled and JSON output requested. Only the first candidate is read: its
//! text parts and its grounding chunks.
//!
//! ## Requirements
//!
//! - A Gemini API key in `GEMINI_API_KEY` (or `API_KEY`)
//!
//! ## Optional Settings
//!
//! - `PAPERAI_MODEL`: model id (default `gemini-2.0-flash-exp`)
//! - `GEMINI_BASE_URL`: API host, mainly for tests
//! - `PAPERAI_TIMEOUT_SECS`: request timeout in seconds (default 120)

use crate::report::GroundingChunk;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{Span, debug, info, instrument, warn};

/// Gemini API base URL
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Environment variable for the Gemini API key
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Generic API key variable, checked when `GEMINI_API_KEY` is unset
pub const FALLBACK_API_KEY_ENV: &str = "API_KEY";

/// Environment variable overriding the model id
pub const MODEL_ENV: &str = "PAPERAI_MODEL";

/// Environment variable overriding the API base URL
pub const BASE_URL_ENV: &str = "GEMINI_BASE_URL";

/// Environment variable overriding the request timeout (seconds)
pub const TIMEOUT_ENV: &str = "PAPERAI_TIMEOUT_SECS";

pub const GEMINI_2_0_FLASH_EXP: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_MODEL: &str = GEMINI_2_0_FLASH_EXP;

/// Grounded generations routinely take tens of seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors that can occur while talking to Gemini.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// No usable API key was configured
    #[error("Gemini API key is missing: set GEMINI_API_KEY (or API_KEY)")]
    MissingApiKey,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse the API response envelope
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl GeminiError {
    /// True for errors detected before any request is sent.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::MissingApiKey | Self::ConfigError(_))
    }
}

/// Configuration for the Gemini client.
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key for authentication
    pub api_key: String,
    /// Model id, e.g. `gemini-2.0-flash-exp`
    pub model: String,
    /// API base URL (scheme and host)
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Create configuration with explicit values.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_API_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// ## Errors
    ///
    /// - `GeminiError::MissingApiKey` - neither key variable holds a non-blank value
    /// - `GeminiError::ConfigError` - the timeout is not a positive integer
    pub fn from_env() -> Result<Self, GeminiError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// ## Examples
    ///
    /// ```
    /// use paperai_lib::providers::gemini::GeminiConfig;
    ///
    /// let config = GeminiConfig::from_lookup(|key| match key {
    ///     "GEMINI_API_KEY" => Some("secret".to_string()),
    ///     "PAPERAI_MODEL" => Some("gemini-2.5-pro".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.model, "gemini-2.5-pro");
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GeminiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = non_blank(GEMINI_API_KEY_ENV)
            .or_else(|| non_blank(FALLBACK_API_KEY_ENV))
            .ok_or(GeminiError::MissingApiKey)?;

        let mut config = Self::new(api_key.trim());

        if let Some(model) = non_blank(MODEL_ENV) {
            config.model = model.trim().to_string();
        }
        if let Some(base_url) = non_blank(BASE_URL_ENV) {
            config.base_url = base_url.trim().to_string();
        }
        if let Some(timeout) = non_blank(TIMEOUT_ENV) {
            let secs = timeout
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| {
                    GeminiError::ConfigError(format!(
                        "{TIMEOUT_ENV} must be a positive number of seconds, got '{timeout}'"
                    ))
                })?;
            config.timeout = Duration::from_secs(secs);
        }

        debug!(
            model = %config.model,
            base_url = %config.base_url,
            timeout_secs = config.timeout.as_secs(),
            "Gemini configured"
        );

        Ok(config)
    }

    /// Set the model id.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (useful for testing).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check the configuration before any request is issued.
    pub fn validate(&self) -> Result<(), GeminiError> {
        if self.api_key.trim().is_empty() {
            return Err(GeminiError::MissingApiKey);
        }
        if self.model.trim().is_empty() {
            return Err(GeminiError::ConfigError("model id cannot be empty".to_string()));
        }
        url::Url::parse(&self.base_url).map_err(|e| {
            GeminiError::ConfigError(format!("invalid base URL '{}': {e}", self.base_url))
        })?;
        if self.timeout.is_zero() {
            return Err(GeminiError::ConfigError("timeout must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Full `generateContent` URL for the configured model.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    tools: Vec<ToolSpec>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolSpec {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

impl<'a> GenerateContentRequest<'a> {
    fn grounded_json(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            tools: vec![ToolSpec {
                google_search: GoogleSearch {},
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    /// Reasoning summaries are not part of the answer
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

/// Gemini API error response.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    status: Option<String>,
}

/// Text and citations from one generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundedResponse {
    /// Concatenated text parts of the first candidate, `None` when there were none
    pub text: Option<String>,
    /// Grounding chunks of the first candidate, in service order
    pub grounding_chunks: Vec<GroundingChunk>,
}

impl From<GenerateContentResponse> for GroundedResponse {
    fn from(response: GenerateContentResponse) -> Self {
        let Some(candidate) = response.candidates.into_iter().next() else {
            return Self::default();
        };

        let texts: Vec<String> = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|p| !p.thought)
            .filter_map(|p| p.text)
            .collect();

        Self {
            text: if texts.is_empty() {
                None
            } else {
                Some(texts.concat())
            },
            grounding_chunks: candidate
                .grounding_metadata
                .map(|g| g.grounding_chunks)
                .unwrap_or_default(),
        }
    }
}

/// Client for search-grounded generations.
///
/// The client only holds configuration. Every call builds its own HTTP client
/// and request, so calls share no connection state.
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: GeminiConfig) -> Self {
        Self { config }
    }

    /// Create a new client from environment variables.
    pub fn from_env() -> Result<Self, GeminiError> {
        Ok(Self::new(GeminiConfig::from_env()?))
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Send one prompt with Google Search grounding and JSON output enabled.
    ///
    /// ## Errors
    ///
    /// - `GeminiError::MissingApiKey` / `GeminiError::ConfigError` - invalid configuration, nothing sent
    /// - `GeminiError::HttpError` - network failure or timeout
    /// - `GeminiError::ApiError` - non-success status (auth, quota, rate limit, ...)
    /// - `GeminiError::ParseError` - the response envelope was not valid JSON
    #[instrument(
        name = "gemini_generate",
        skip(self, prompt),
        fields(
            model = %self.config.model,
            prompt_len = prompt.len(),
            http.status_code = tracing::field::Empty,
            otel.kind = "client"
        )
    )]
    pub async fn generate_grounded_json(
        &self,
        prompt: &str,
    ) -> Result<GroundedResponse, GeminiError> {
        self.config.validate()?;
        let start = Instant::now();

        let client = Client::builder().timeout(self.config.timeout).build()?;
        let response = client
            .post(self.config.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .header("Accept", "application/json")
            .json(&GenerateContentRequest::grounded_json(prompt))
            .send()
            .await;

        match &response {
            Ok(resp) => {
                let status = resp.status().as_u16();
                Span::current().record("http.status_code", status);
                debug!(http.status_code = status, "Received API response");
            }
            Err(e) => {
                warn!(error = %e, "Gemini request failed");
            }
        }

        let response = response?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => match envelope.error.status {
                    Some(code) => format!("{code}: {}", envelope.error.message),
                    None => envelope.error.message,
                },
                Err(_) => body,
            };
            warn!(status, %message, "API returned error");
            return Err(GeminiError::ApiError { status, message });
        }

        let body = response.text().await?;
        let envelope: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| GeminiError::ParseError(e.to_string()))?;

        let finish_reason = envelope
            .candidates
            .first()
            .and_then(|c| c.finish_reason.clone());
        let grounded = GroundedResponse::from(envelope);

        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            text_len = grounded.text.as_ref().map_or(0, String::len),
            grounding_chunks = grounded.grounding_chunks.len(),
            finish_reason = ?finish_reason,
            "Gemini generation completed"
        );

        Ok(grounded)
    }
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.config.endpoint())
            .finish_non_exhaustive()
    }
}
