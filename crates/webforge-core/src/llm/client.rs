//! Chat completion client
//!
//! Async HTTP client for OpenAI-compatible chat completion APIs.
//! A failed request is mapped to a typed [`Error`] and returned as-is:
//! there is no retry and no model fallback.

use std::time::Duration;

use reqwest::Client as HttpClient;
use tracing::{debug, info, warn};

use crate::config::{LlmConfig, redact_api_key};
use crate::error::{Error, Result};

use super::prompt::system_prompt;
use super::types::{ApiErrorBody, ChatRequest, ChatResponse, LlmResponse, Message};

/// Text returned when the service answers without any content
pub const EMPTY_GENERATION_TEXT: &str = "Error while generating code.";

/// Chat completion client bound to one credential
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct LlmClient {
    /// HTTP client for making requests
    http_client: HttpClient,
    /// LLM configuration (model, temperature, etc.)
    config: LlmConfig,
    /// API key for authentication
    api_key: String,
    /// Base URL for the API
    base_url: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("model", &self.config.model)
            .field("api_key", &redact_api_key(&self.api_key))
            .finish()
    }
}

/// Builder for creating an LlmClient
#[derive(Default)]
pub struct LlmClientBuilder {
    config: Option<LlmConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl LlmClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the LLM configuration
    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the base URL from the configuration
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Build the LlmClient
    pub fn build(self) -> Result<LlmClient> {
        let config = self.config.unwrap_or_default();
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(Error::MissingApiKey)?;

        let mut http = HttpClient::builder();
        if let Some(secs) = self.timeout_secs.or(config.timeout_secs) {
            http = http.timeout(Duration::from_secs(secs));
        }
        let http_client = http.build().map_err(Error::NetworkError)?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| config.base_url.clone())
            .trim_end_matches('/')
            .to_string();

        Ok(LlmClient {
            http_client,
            config,
            api_key,
            base_url,
        })
    }
}

impl LlmClient {
    /// Create a new LlmClient with the given configuration and API key
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        LlmClientBuilder::new()
            .config(config)
            .api_key(api_key)
            .build()
    }

    /// Create a new builder for LlmClient
    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::new()
    }

    /// Model used for completions
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Base URL of the completion API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Redacted form of the credential, safe to display
    pub fn redacted_key(&self) -> String {
        redact_api_key(&self.api_key)
    }

    /// Generate web code for a prompt
    ///
    /// Sends the fixed system instructions (plus the optional project context)
    /// and the user prompt, and returns the first choice's text.
    pub async fn generate_code(&self, prompt: &str, context: Option<&str>) -> Result<String> {
        let messages = vec![Message::system(system_prompt(context)), Message::user(prompt)];

        match self.complete(messages).await {
            Ok(response) if !response.content.is_empty() => {
                info!(
                    model = %response.model,
                    tokens = response.tokens_used,
                    finish_reason = %response.finish_reason,
                    "Code generated"
                );
                Ok(response.content)
            }
            Ok(_) => {
                warn!("Completion returned no content");
                Ok(EMPTY_GENERATION_TEXT.to_string())
            }
            Err(Error::LLMError(msg)) if msg == EMPTY_RESPONSE => {
                warn!("Completion returned no choices");
                Ok(EMPTY_GENERATION_TEXT.to_string())
            }
            Err(e) => Err(e),
        }
    }

    /// Make a single chat completion request
    pub async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        let request = ChatRequest::new(&self.config.model, messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        self.send_request(&request).await
    }

    /// Send a single request to the API
    async fn send_request(&self, request: &ChatRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = map_error_response(status.as_u16(), &body);
            warn!(status = status.as_u16(), code = error.code(), "Completion request failed");
            return Err(error);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LLMError(format!("Failed to parse response: {}", e)))?;

        LlmResponse::from_chat_response(chat_response)
            .ok_or_else(|| Error::LLMError(EMPTY_RESPONSE.to_string()))
    }
}

const EMPTY_RESPONSE: &str = "Empty response from API";

/// A timed-out request reached the service, so only real transport failures count as network errors
fn map_transport_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::LLMError(format!("Request timed out: {}", error))
    } else {
        Error::NetworkError(error)
    }
}

/// Map a non-success HTTP response to a typed error
pub fn map_error_response(status: u16, body: &str) -> Error {
    let message = extract_error_message(body);

    match status {
        401 => Error::Unauthorized(message),
        403 => Error::Forbidden(message),
        402 | 429 => Error::QuotaExceeded(message),
        _ if mentions_quota(body) => Error::QuotaExceeded(message),
        500..=599 => Error::ServerError(status, message),
        _ => Error::LLMError(format!("HTTP error {}: {}", status, message)),
    }
}

/// Pull the human-readable message out of an error body, falling back to the raw text
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .map(|parsed| parsed.error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

fn mentions_quota(body: &str) -> bool {
    body.to_lowercase().contains("quota")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LlmConfig {
        LlmConfig {
            base_url: "https://example.com/v1/".to_string(),
            model: "test/model".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: Some(30),
            env_key_fallback: false,
        }
    }

    #[test]
    fn test_client_builder() {
        let client = LlmClient::builder()
            .config(test_config())
            .api_key("test-key")
            .base_url("https://override.example.com/")
            .timeout_secs(60)
            .build()
            .unwrap();

        assert_eq!(client.model(), "test/model");
        assert_eq!(client.base_url(), "https://override.example.com");
    }

    #[test]
    fn test_base_url_from_config_is_trimmed() {
        let client = LlmClient::new(test_config(), "test-key").unwrap();
        assert_eq!(client.base_url(), "https://example.com/v1");
    }

    #[test]
    fn test_client_builder_requires_api_key() {
        let missing = LlmClient::builder().config(test_config()).build();
        assert!(matches!(missing, Err(Error::MissingApiKey)));

        let blank = LlmClient::new(test_config(), "   ");
        assert!(matches!(blank, Err(Error::MissingApiKey)));
    }

    #[test]
    fn test_client_debug_redacts_key() {
        let client = LlmClient::new(test_config(), "sk-secret-1234").unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("LlmClient"));
        assert!(debug.contains("test/model"));
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("***1234"));
    }

    #[test]
    fn test_client_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LlmClient>();
    }

    #[test]
    fn test_map_error_statuses() {
        assert!(matches!(map_error_response(401, ""), Error::Unauthorized(_)));
        assert!(matches!(map_error_response(403, ""), Error::Forbidden(_)));
        assert!(matches!(map_error_response(429, ""), Error::QuotaExceeded(_)));
        assert!(matches!(map_error_response(402, ""), Error::QuotaExceeded(_)));
        assert!(matches!(map_error_response(503, "busy"), Error::ServerError(503, _)));
        assert!(matches!(map_error_response(404, "nope"), Error::LLMError(_)));
    }

    #[test]
    fn test_map_error_quota_in_body() {
        let body = r#"{"error": {"message": "You exceeded your current quota", "type": "insufficient_quota"}}"#;
        match map_error_response(400, body) {
            Error::QuotaExceeded(msg) => assert_eq!(msg, "You exceeded your current quota"),
            other => panic!("expected quota error, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"error": {"message": "Incorrect API key provided"}}"#),
            "Incorrect API key provided"
        );
        assert_eq!(extract_error_message("  plain text  "), "plain text");
        assert_eq!(extract_error_message(r#"{"error": {"message": ""}}"#), r#"{"error": {"message": ""}}"#);
    }
}
