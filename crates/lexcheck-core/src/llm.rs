//! Structured-output text-completion interface
//!
//! Classification, rationale and summarization all talk to the language model
//! through [`CompletionClient`]. Implementations must honour `temperature`
//! so that a temperature of 0 gives reproducible output.

use crate::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A chat message in the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }
}

/// Expected shape of the completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Free text
    #[default]
    Text,
    /// A single JSON object
    Json,
}

/// A completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub response_format: ResponseFormat,
}

impl CompletionRequest {
    /// Create a deterministic (temperature 0) text request
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            temperature: 0.0,
            max_tokens: None,
            response_format: ResponseFormat::Text,
        }
    }

    /// Add a system message
    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::system(content));
        self
    }

    /// Add a user message
    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(content));
        self
    }

    /// Request a JSON object
    pub fn json(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Cap the response length
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// A completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text
    pub content: String,

    /// Model that produced the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Reason the model stopped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    /// Wall-clock latency in milliseconds
    pub latency_ms: u64,
}

impl CompletionResponse {
    /// Create a response with only content
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: None,
            finish_reason: None,
            latency_ms: 0,
        }
    }

    /// Parse the content as a JSON payload, see [`parse_json_payload`]
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        parse_json_payload(&self.content)
    }
}

/// Trait for completion backends
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run a completion
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;

    /// Backend name (for logging)
    fn name(&self) -> &str;

    /// Model identifier
    fn model(&self) -> &str;
}

/// Parse a JSON object out of model output.
///
/// Tolerates surrounding whitespace and a single markdown code fence
/// (```json ... ```). Anything else that is not valid JSON for `T` is an
/// [`Error::Llm`].
pub fn parse_json_payload<T: DeserializeOwned>(content: &str) -> Result<T> {
    let body = strip_code_fence(content.trim());
    serde_json::from_str(body).map_err(|e| Error::llm(format!("invalid JSON payload: {}", e)))
}

fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    // Drop the info string (e.g. `json`) up to the first newline
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        decision: String,
    }

    #[test]
    fn test_parse_plain_json() {
        let payload: Payload = parse_json_payload(r#" {"decision": "YES"} "#).unwrap();
        assert_eq!(payload.decision, "YES");
    }

    #[test]
    fn test_parse_fenced_json() {
        let content = "```json\n{\"decision\": \"NO\"}\n```";
        let payload: Payload = parse_json_payload(content).unwrap();
        assert_eq!(payload.decision, "NO");

        let content = "```\n{\"decision\": \"PARTIAL\"}\n```";
        let payload: Payload = parse_json_payload(content).unwrap();
        assert_eq!(payload.decision, "PARTIAL");
    }

    #[test]
    fn test_parse_rejects_prose() {
        let result: Result<Payload> = parse_json_payload("I think the answer is YES");
        assert!(matches!(result, Err(Error::Llm(_))));
    }

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::new()
            .system("You are a compliance analyst")
            .user("Classify this")
            .json()
            .with_max_tokens(200);

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.response_format, ResponseFormat::Json);
        assert_eq!(request.max_tokens, Some(200));
    }
}
