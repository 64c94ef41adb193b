/// LLM Client: the single point of entry for every reasoning-service call.
///
/// ARCHITECTURAL RULE: stages never talk to the Anthropic API directly.
/// They hold an `Arc<dyn ReasoningService>`, which is `LlmClient` in production
/// and a scripted double in tests.
///
/// This client makes exactly one HTTP attempt per call. Bounded retries with
/// backoff belong to the pipeline coordinator, which owns the retry budget.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;
pub mod structured;
#[cfg(test)]
pub mod testing;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Failures of the external reasoning service.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("service unavailable (status {status}): {message}")]
    Unavailable { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("service returned empty content")]
    EmptyContent,

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ServiceError {
    /// Transient failures worth another attempt at the stage level.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::Timeout(_)
                | ServiceError::RateLimited(_)
                | ServiceError::Unavailable { .. }
                | ServiceError::Transport(_)
        )
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ServiceError::Timeout(Duration::ZERO)
        } else {
            ServiceError::Transport(e.to_string())
        }
    }
}

/// The completion capability every LLM-backed stage depends on.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Sends one system + user prompt pair and returns the raw text reply.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ServiceError>;
}

/// Model settings pinned per run so identical input gives identical prompts.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Anthropic Messages API client.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(api_key: String, settings: LlmSettings) -> Self {
        Self {
            client: Client::builder()
                .timeout(settings.request_timeout)
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            settings,
        }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Makes a raw call to the Messages API, returning the full response object.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, ServiceError> {
        let request_body = AnthropicRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(
            "LLM call: model={} prompt_chars={}",
            self.settings.model,
            prompt.len()
        );

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| match ServiceError::from(e) {
                ServiceError::Timeout(_) => ServiceError::Timeout(self.settings.request_timeout),
                other => other,
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(classify_status(status.as_u16(), message));
        }

        let llm_response: LlmResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::MalformedResponse(format!("response envelope: {e}")))?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        Ok(llm_response)
    }
}

#[async_trait]
impl ReasoningService for LlmClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ServiceError> {
        let response = self.call(prompt, system).await?;
        response
            .text()
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .ok_or(ServiceError::EmptyContent)
    }
}

/// Maps a non-success HTTP status onto the retryable/fatal taxonomy.
fn classify_status(status: u16, message: String) -> ServiceError {
    match status {
        429 => ServiceError::RateLimited(message),
        500..=599 => ServiceError::Unavailable { status, message },
        _ => ServiceError::Api { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_429_is_rate_limited_and_retryable() {
        let err = classify_status(429, "slow down".to_string());
        assert!(matches!(err, ServiceError::RateLimited(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_5xx_is_retryable() {
        let err = classify_status(529, "overloaded".to_string());
        assert!(matches!(err, ServiceError::Unavailable { status: 529, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_4xx_is_fatal() {
        let err = classify_status(400, "bad request".to_string());
        assert!(matches!(err, ServiceError::Api { status: 400, .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_malformed_response_is_not_retryable() {
        assert!(!ServiceError::MalformedResponse("x".to_string()).is_retryable());
        assert!(ServiceError::Timeout(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn test_response_text_picks_first_text_block() {
        let json = r#"{
            "content": [
                {"type": "tool_use", "text": null},
                {"type": "text", "text": "{\"ok\": true}"}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 4}
        }"#;
        let response: LlmResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), Some("{\"ok\": true}"));
    }
}
