//! HTTP client implementations for the supported LLM backends.
//!
//! Both clients are synchronous (blocking reqwest) with explicit timeouts.
//! A request that never resolves is cut off by the 60 second client timeout
//! and surfaces as [`LlmError::Timeout`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::tagger::prompt::{build_prompt, parse_tag_response};

/// Errors that can occur when calling an LLM backend.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request or response timeout errors
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// HTTP errors with status code
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// Backend returned a response the client could not use
    #[error("API error: {message}")]
    Api { message: String },

    /// Missing or invalid client configuration (API key, model, URL)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// The supported LLM backend kinds.
///
/// This is a closed set: pool lookups and fallback selection key on the
/// variant, not on client type identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Anthropic Claude (messages API).
    Claude,
    /// OpenAI (chat completions API).
    OpenAi,
}

impl ProviderKind {
    /// Returns the deterministic fallback for this provider kind.
    ///
    /// With exactly two supported kinds, each is the other's fallback.
    #[must_use]
    pub fn fallback(self) -> ProviderKind {
        match self {
            ProviderKind::Claude => ProviderKind::OpenAi,
            ProviderKind::OpenAi => ProviderKind::Claude,
        }
    }

    /// Returns the short lowercase name used in CLI flags and messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "openai" | "gpt" => Ok(ProviderKind::OpenAi),
            other => Err(format!(
                "unknown provider '{other}', expected 'claude' or 'openai'"
            )),
        }
    }
}

/// Trait for tag-generation LLM clients.
///
/// This trait enables mocking in unit tests and gives the provider pool a
/// uniform capability interface across backend kinds.
pub trait LlmClient: Send + Sync {
    /// Returns the backend kind this client talks to.
    fn kind(&self) -> ProviderKind;

    /// Returns the model identifier this client is configured with.
    fn model(&self) -> &str;

    /// Generates tags for the given document body.
    ///
    /// `vocabulary` is the set of tags already in use across the corpus; it is
    /// embedded in the prompt so the model prefers existing tags over near
    /// duplicates. The returned tags are raw model output, not yet normalized.
    fn generate_tags(&self, body: &str, vocabulary: &[String]) -> Result<Vec<String>, LlmError>;
}

fn build_http_client() -> Result<reqwest::blocking::Client, LlmError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(5))
        .build()
        .map_err(LlmError::Network)
}

fn classify_transport_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(e)
    } else {
        LlmError::Network(e)
    }
}

// ============ Claude ============

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const CLAUDE_API_VERSION: &str = "2023-06-01";
const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-haiku-latest";

/// Builder for constructing `ClaudeClient` instances.
#[derive(Debug, Default)]
pub struct ClaudeClientBuilder {
    api_key: Option<String>,
    model: Option<String>,
}

impl ClaudeClientBuilder {
    /// Creates a new `ClaudeClientBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key for the Anthropic API.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model identifier (e.g. "claude-3-5-haiku-latest").
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Builds the `ClaudeClient` with the configured settings.
    ///
    /// If `api_key()` was not called, the `ANTHROPIC_API_KEY` environment
    /// variable is checked. If `model()` was not called, `TAGSMITH_CLAUDE_MODEL`
    /// is checked and then a default model is used.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidConfig` if no API key is available.
    pub fn build(self) -> Result<ClaudeClient, LlmError> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                LlmError::InvalidConfig("ANTHROPIC_API_KEY is not set".to_string())
            })?;

        let model = self
            .model
            .or_else(|| std::env::var("TAGSMITH_CLAUDE_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_CLAUDE_MODEL.to_string());

        Ok(ClaudeClient {
            client: build_http_client()?,
            api_key,
            model,
        })
    }
}

/// Synchronous HTTP client for the Anthropic messages API.
pub struct ClaudeClient {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl ClaudeClient {
    fn request_completion(&self, prompt: &str) -> Result<String, LlmError> {
        let request_body = serde_json::json!({
            "model": self.model,
            "max_tokens": 1024,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .client
            .post(CLAUDE_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", CLAUDE_API_VERSION)
            .json(&request_body)
            .send()
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Http {
                status: status.as_u16(),
            });
        }

        let parsed: MessagesResponse = response.json().map_err(classify_transport_error)?;

        // Messages API returns a list of content blocks; the first text block
        // carries the completion.
        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| LlmError::Api {
                message: "Missing text content in API response".to_string(),
            })
    }
}

impl LlmClient for ClaudeClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate_tags(&self, body: &str, vocabulary: &[String]) -> Result<Vec<String>, LlmError> {
        let prompt = build_prompt(body, vocabulary);
        let response = self.request_completion(&prompt)?;
        Ok(parse_tag_response(&response))
    }
}

// ============ OpenAI ============

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Builder for constructing `OpenAiClient` instances.
#[derive(Debug, Default)]
pub struct OpenAiClientBuilder {
    api_key: Option<String>,
    model: Option<String>,
}

impl OpenAiClientBuilder {
    /// Creates a new `OpenAiClientBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key for the OpenAI API.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model identifier (e.g. "gpt-4o-mini").
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Builds the `OpenAiClient` with the configured settings.
    ///
    /// If `api_key()` was not called, the `OPENAI_API_KEY` environment
    /// variable is checked. If `model()` was not called, `TAGSMITH_OPENAI_MODEL`
    /// is checked and then a default model is used.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidConfig` if no API key is available.
    pub fn build(self) -> Result<OpenAiClient, LlmError> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidConfig("OPENAI_API_KEY is not set".to_string()))?;

        let model = self
            .model
            .or_else(|| std::env::var("TAGSMITH_OPENAI_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());

        Ok(OpenAiClient {
            client: build_http_client()?,
            api_key,
            model,
        })
    }
}

/// Synchronous HTTP client for the OpenAI chat completions API.
pub struct OpenAiClient {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    fn request_completion(&self, prompt: &str) -> Result<String, LlmError> {
        let request_body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.2,
        });

        let response = self
            .client
            .post(OPENAI_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Http {
                status: status.as_u16(),
            });
        }

        let parsed: ChatResponse = response.json().map_err(classify_transport_error)?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| LlmError::Api {
                message: "Missing message content in API response".to_string(),
            })
    }
}

impl LlmClient for OpenAiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate_tags(&self, body: &str, vocabulary: &[String]) -> Result<Vec<String>, LlmError> {
        let prompt = build_prompt(body, vocabulary);
        let response = self.request_completion(&prompt)?;
        Ok(parse_tag_response(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn provider_kind_fallback_is_one_to_one() {
        assert_eq!(ProviderKind::Claude.fallback(), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::OpenAi.fallback(), ProviderKind::Claude);
        // Applying fallback twice returns the original kind.
        assert_eq!(
            ProviderKind::Claude.fallback().fallback(),
            ProviderKind::Claude
        );
    }

    #[test]
    fn provider_kind_parses_from_str() {
        assert_eq!("claude".parse::<ProviderKind>(), Ok(ProviderKind::Claude));
        assert_eq!("anthropic".parse::<ProviderKind>(), Ok(ProviderKind::Claude));
        assert_eq!("openai".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert!("gemini".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn provider_kind_display_matches_cli_names() {
        assert_eq!(ProviderKind::Claude.to_string(), "claude");
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
    }

    #[test]
    fn claude_builder_rejects_missing_api_key() {
        // An explicit empty key is treated the same as an absent one.
        let result = ClaudeClientBuilder::new().api_key("  ").build();
        assert!(matches!(result, Err(LlmError::InvalidConfig(_))));
    }

    #[test]
    fn claude_builder_uses_default_model() {
        let client = ClaudeClientBuilder::new()
            .api_key("test-key")
            .build()
            .unwrap();
        assert_eq!(client.model(), DEFAULT_CLAUDE_MODEL);
        assert_eq!(client.kind(), ProviderKind::Claude);
    }

    #[test]
    fn openai_builder_honors_explicit_model() {
        let client = OpenAiClientBuilder::new()
            .api_key("test-key")
            .model("gpt-4o")
            .build()
            .unwrap();
        assert_eq!(client.model(), "gpt-4o");
        assert_eq!(client.kind(), ProviderKind::OpenAi);
    }

    #[test]
    fn http_error_variant_with_status_code() {
        let err = LlmError::Http { status: 429 };
        let msg = format!("{}", err);
        assert!(msg.contains("HTTP error"));
        assert!(msg.contains("429"));
    }

    #[test]
    fn api_error_variant_carries_message() {
        let err = LlmError::Api {
            message: "Missing text content in API response".to_string(),
        };
        assert!(format!("{}", err).contains("Missing text content"));
    }

    #[test]
    fn network_error_variant_chains_source() {
        let reqwest_error = reqwest::blocking::Client::new()
            .get("not-a-valid-url")
            .build()
            .unwrap_err();
        let err = LlmError::Network(reqwest_error);
        assert!(format!("{}", err).contains("Network error"));
        assert!(err.source().is_some());
    }

    #[test]
    fn messages_response_extracts_first_text_block() {
        let payload = serde_json::json!({
            "content": [
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "[\"rust\", \"async\"]"}
            ],
            "model": "claude-3-5-haiku-latest"
        });
        let parsed: MessagesResponse = serde_json::from_value(payload).unwrap();
        let text = parsed.content.into_iter().find_map(|b| b.text);
        assert_eq!(text.as_deref(), Some("[\"rust\", \"async\"]"));
    }

    #[test]
    fn messages_response_tolerates_missing_content() {
        let parsed: MessagesResponse =
            serde_json::from_value(serde_json::json!({"model": "m"})).unwrap();
        assert!(parsed.content.is_empty());
    }

    #[test]
    fn chat_response_extracts_first_choice_content() {
        let payload = serde_json::json!({
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "[\"tokio\"]"}}
            ]
        });
        let parsed: ChatResponse = serde_json::from_value(payload).unwrap();
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content);
        assert_eq!(content.as_deref(), Some("[\"tokio\"]"));
    }

    #[test]
    fn chat_response_tolerates_null_content() {
        let payload = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        });
        let parsed: ChatResponse = serde_json::from_value(payload).unwrap();
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content);
        assert!(content.is_none());
    }

    #[test]
    fn trait_can_be_implemented_by_mock_struct() {
        struct MockClient;

        impl LlmClient for MockClient {
            fn kind(&self) -> ProviderKind {
                ProviderKind::Claude
            }
            fn model(&self) -> &str {
                "mock"
            }
            fn generate_tags(
                &self,
                _body: &str,
                _vocabulary: &[String],
            ) -> Result<Vec<String>, LlmError> {
                Ok(vec!["rust".to_string()])
            }
        }

        let client = MockClient;
        let tags = client.generate_tags("content", &[]).unwrap();
        assert_eq!(tags, vec!["rust"]);
    }
}
