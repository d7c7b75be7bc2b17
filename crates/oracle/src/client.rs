//! HTTP client for the Gemini `generateContent` API.

use std::time::Duration;

use async_trait::async_trait;
use deck_core::Oracle;
use reqwest::Client;

use crate::types::{resolve_model, GenerateRequest, GenerateResponse, GenerationConfig};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Public Gemini endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Errors from oracle calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("missing API key: {0}")]
    MissingApiKey(String),
}

impl From<LlmError> for deck_core::Error {
    fn from(err: LlmError) -> Self {
        deck_core::Error::OracleUnavailable(err.to_string())
    }
}

/// Connection settings for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl OracleConfig {
    /// Settings with the default model, endpoint and timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            temperature: None,
            max_output_tokens: None,
        }
    }

    /// Read the API key from `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var(API_KEY_VAR).map_err(|_| {
            LlmError::MissingApiKey(format!("{API_KEY_VAR} environment variable not set"))
        })?;
        Ok(Self::new(api_key))
    }

    /// Use `model`; short aliases such as `flash` are resolved.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = resolve_model(model).to_string();
        self
    }

    /// Point at a different endpoint (for proxies and mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sampling temperature; `None` leaves the provider default.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Reply length limit; `None` leaves the provider default.
    pub fn with_max_output_tokens(mut self, max_output_tokens: Option<u32>) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    fn generation_config(&self) -> Option<GenerationConfig> {
        if self.temperature.is_none() && self.max_output_tokens.is_none() {
            return None;
        }
        Some(GenerationConfig {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        })
    }
}

/// Gemini text-completion client. Each call is independent and never retried.
#[derive(Debug)]
pub struct GeminiClient {
    http: Client,
    config: OracleConfig,
}

impl GeminiClient {
    /// Create a client from `config`.
    pub fn new(config: OracleConfig) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Create a client from `GEMINI_API_KEY` with default settings.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::new(OracleConfig::from_env()?)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    /// Send a `generateContent` request.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let url = self.endpoint();
        log::debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(LlmError::RateLimited { retry_after });
        }

        if status >= 400 {
            let body = response.text().await.unwrap_or_else(|_| "(no body)".into());
            return Err(LlmError::ApiError {
                status,
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("failed to parse response: {e}")))
    }

    /// Request for `prompt` as a single user turn, with the configured sampling settings.
    pub fn request_for(&self, prompt: &str) -> GenerateRequest {
        let mut request = GenerateRequest::from_prompt(prompt);
        request.generation_config = self.config.generation_config();
        request
    }

    /// Send `prompt` as a single user turn and return the reply text.
    pub async fn complete_text(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self.generate(&self.request_for(prompt)).await?;
        reply_text(&response)
    }
}

#[async_trait]
impl Oracle for GeminiClient {
    async fn complete(&self, instruction: &str) -> deck_core::Result<String> {
        Ok(self.complete_text(instruction).await?)
    }
}

fn reply_text(response: &GenerateResponse) -> Result<String, LlmError> {
    if let Some(reason) = response.finish_reason().filter(|r| *r != "STOP") {
        log::warn!("Reply ended early ({}); it may be incomplete", reason);
    }
    if let Some(text) = response.text() {
        return Ok(text);
    }
    match response.block_reason() {
        Some(reason) => Err(LlmError::InvalidResponse(format!(
            "prompt blocked: {reason}"
        ))),
        None => Err(LlmError::InvalidResponse("reply contained no text".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = OracleConfig::new("test-key");
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.base_url, "https://generativelanguage.googleapis.com");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn request_carries_sampling_settings() {
        let client = GeminiClient::new(OracleConfig::new("test-key")).unwrap();
        assert!(client.request_for("hi").generation_config.is_none());

        let config = OracleConfig::new("test-key")
            .with_temperature(Some(0.5))
            .with_max_output_tokens(Some(4096));
        let client = GeminiClient::new(config).unwrap();
        let json = serde_json::to_value(client.request_for("hi")).unwrap();
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 4096);
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }

    #[test]
    fn truncated_reply_still_returns_text() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"slides\": ["}]},"finishReason":"MAX_TOKENS"}]}"#,
        )
        .unwrap();
        assert_eq!(response.finish_reason(), Some("MAX_TOKENS"));
        assert_eq!(reply_text(&response).unwrap(), r#"{"slides": ["#);
    }

    #[test]
    fn client_endpoint() {
        let config = OracleConfig::new("test-key")
            .with_model("pro")
            .with_base_url("http://localhost:8080/");
        let client = GeminiClient::new(config).unwrap();
        assert_eq!(client.model(), "gemini-1.5-pro");
        assert_eq!(
            client.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn reply_text_reports_block_reason() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        let err = reply_text(&response).unwrap_err();
        assert_eq!(err.to_string(), "invalid response: prompt blocked: SAFETY");

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            reply_text(&empty),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn error_display() {
        let err = LlmError::ApiError {
            status: 401,
            message: "invalid api key".into(),
        };
        assert_eq!(err.to_string(), "API error (status 401): invalid api key");

        let err = LlmError::RateLimited {
            retry_after: Some(30),
        };
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn errors_surface_as_oracle_unavailable() {
        let err: deck_core::Error = LlmError::MissingApiKey("GEMINI_API_KEY".into()).into();
        match err {
            deck_core::Error::OracleUnavailable(msg) => {
                assert_eq!(msg, "missing API key: GEMINI_API_KEY")
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_oracle_unavailable() {
        let config = OracleConfig::new("test-key")
            .with_base_url("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(2));
        let client = GeminiClient::new(config).unwrap();

        let err = client.complete("Create a deck").await.unwrap_err();
        assert!(matches!(err, deck_core::Error::OracleUnavailable(_)));
    }
}
