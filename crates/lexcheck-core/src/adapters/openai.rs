//! OpenAI-compatible chat completions adapter
//!
//! Talks to any endpoint exposing the OpenAI chat completions wire format:
//! ```text
//! POST {base_url}/chat/completions
//! {"model":"gpt-4o-mini","messages":[...],"temperature":0,
//!  "response_format":{"type":"json_object"}}
//! ```

use crate::llm::{
    ChatMessage, CompletionClient, CompletionRequest, CompletionResponse, ResponseFormat,
};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token; read from the environment by the caller
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Timeout of a single HTTP attempt
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retry policy for transient failures
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            retry: RetryPolicy::default(),
        }
    }
}

impl OpenAiConfig {
    /// Worst-case duration of one completion, retries and backoff included.
    ///
    /// Callers that put their own deadline around a completion must allow at
    /// least this much, or retries are cut off.
    pub fn retry_budget(&self) -> Duration {
        self.retry.budget(Duration::from_millis(self.timeout_ms))
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// OpenAI-compatible completion client
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self { http, config })
    }

    /// Get the active configuration
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    async fn send_once(&self, body: &OpenAiRequest<'_>) -> Result<OpenAiCompletion> {
        let mut request = self.http.post(self.endpoint()).json(body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json::<OpenAiCompletion>().await?)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let start = Instant::now();
        let body = OpenAiRequest::from_request(&self.config.model, request);

        let completion = retry_with_backoff(&self.config.retry, "chat_completion", || {
            self.send_once(&body)
        })
        .await?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::llm("completion returned no choices"))?;

        let content = choice
            .message
            .content
            .ok_or_else(|| Error::llm("completion returned empty content"))?;

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(model = %self.config.model, latency_ms, "Completion received");

        Ok(CompletionResponse {
            content,
            model: completion.model,
            finish_reason: choice.finish_reason,
            latency_ms,
        })
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

// =============================================================================
// OpenAI Wire Structures
// =============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAiResponseFormat>,
}

impl<'a> OpenAiRequest<'a> {
    fn from_request(model: &'a str, request: &'a CompletionRequest) -> Self {
        let response_format = match request.response_format {
            ResponseFormat::Json => Some(OpenAiResponseFormat {
                kind: "json_object",
            }),
            ResponseFormat::Text => None,
        };

        Self {
            model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format,
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct OpenAiCompletion {
    model: Option<String>,
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_json_mode() {
        let request = CompletionRequest::new().user("classify").json();
        let body = OpenAiRequest::from_request("gpt-4o-mini", &request);
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["temperature"], 0.0);
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][0]["role"], "user");
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn test_request_serialization_text_mode() {
        let request = CompletionRequest::new().user("explain").with_max_tokens(150);
        let body = OpenAiRequest::from_request("m", &request);
        let value = serde_json::to_value(&body).unwrap();

        assert!(value.get("response_format").is_none());
        assert_eq!(value["max_tokens"], 150);
    }

    #[test]
    fn test_parse_completion() {
        let data = concat!(
            r#"{"id":"chatcmpl-123","object":"chat.completion","created":1,"model":"gpt-4o-mini","#,
            r#""choices":[{"index":0,"message":{"role":"assistant","#,
            r#""content":"{\"decision\":\"YES\"}"},"finish_reason":"stop"}]}"#
        );
        let completion: OpenAiCompletion = serde_json::from_str(data).unwrap();

        assert_eq!(completion.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(completion.choices.len(), 1);
        assert_eq!(completion.choices[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(
            completion.choices[0].message.content.as_deref(),
            Some("{\"decision\":\"YES\"}")
        );
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = OpenAiClient::new(OpenAiConfig {
            base_url: "http://localhost:8000/v1/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn test_default_retry_budget() {
        let config = OpenAiConfig::default();
        assert_eq!(config.retry_budget(), Duration::from_millis(30_600));

        let single = OpenAiConfig {
            timeout_ms: 2_000,
            retry: RetryPolicy::none(),
            ..Default::default()
        };
        assert_eq!(single.retry_budget(), Duration::from_millis(2_000));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails() {
        let client = OpenAiClient::new(OpenAiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_ms: 200,
            retry: RetryPolicy::none(),
            ..Default::default()
        })
        .unwrap();

        let result = client.complete(&CompletionRequest::new().user("hi")).await;
        assert!(result.is_err());
    }
}
