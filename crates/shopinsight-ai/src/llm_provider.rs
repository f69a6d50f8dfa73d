use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Result type for LLM operations
pub type LLMResult<T> = anyhow::Result<T>;

/// Configuration for generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Temperature for sampling (0.0 to 2.0)
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: Option<usize>,
    /// Top-p nucleus sampling parameter
    pub top_p: Option<f32>,
    /// Stop sequences
    pub stop: Option<Vec<String>>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: Some(2048),
            top_p: None,
            stop: None,
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Response from the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    /// Generated text content
    pub content: String,
    /// Total tokens used in the request
    pub total_tokens: Option<usize>,
    /// Tokens used in the prompt
    pub prompt_tokens: Option<usize>,
    /// Tokens generated in the completion
    pub completion_tokens: Option<usize>,
    /// Finish reason (e.g., "stop", "length")
    pub finish_reason: Option<String>,
    /// Model used for generation
    pub model: String,
}

/// Main trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for a single prompt
    async fn generate(&self, prompt: &str) -> LLMResult<LLMResponse> {
        self.generate_chat(&[Message::user(prompt)], &GenerationConfig::default())
            .await
    }

    /// Generate a completion with custom configuration
    async fn generate_with_config(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        self.generate_chat(&[Message::user(prompt)], config).await
    }

    /// Generate a chat completion with message history
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse>;

    /// Check if the provider is available and ready
    async fn is_available(&self) -> bool;

    /// Get the name of this provider
    fn provider_name(&self) -> &str;

    /// Get the model identifier
    fn model_name(&self) -> &str;
}

/// Failure of a single provider HTTP request.
#[derive(Debug, Error)]
pub enum ProviderRequestError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: StatusCode, body: String },
}

impl ProviderRequestError {
    /// Connection problems, timeouts, rate limiting and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderRequestError::Http(e) => e.is_timeout() || e.is_connect(),
            ProviderRequestError::Api { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
        }
    }
}

/// Decode a successful JSON body, or turn a non-2xx response into
/// [`ProviderRequestError::Api`] carrying the body text.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderRequestError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(ProviderRequestError::Api { status, body });
    }
    Ok(response.json::<T>().await?)
}

/// Run `request` up to `max_retries + 1` times, backing off between
/// attempts. Only transient failures are retried.
pub(crate) async fn with_retries<T, F, Fut>(
    provider: &str,
    max_retries: u32,
    mut request: F,
) -> LLMResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderRequestError>>,
{
    let mut attempt = 0;
    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_retries => {
                attempt += 1;
                tracing::warn!(
                    provider,
                    attempt,
                    max_retries,
                    error = %e,
                    "Provider request failed, retrying"
                );
                tokio::time::sleep(backoff_delay(attempt)).await;
            }
            Err(e) => return Err(anyhow::anyhow!("{} {}", provider, e)),
        }
    }
}

/// Exponential backoff delay before retry `attempt` (1-based): 1s, 2s, 4s...
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(attempt.saturating_sub(1).min(6)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(1).as_secs(), 1);
        assert_eq!(backoff_delay(2).as_secs(), 2);
        assert_eq!(backoff_delay(3).as_secs(), 4);
        assert_eq!(backoff_delay(40).as_secs(), 64);
    }

    #[test]
    fn test_transient_statuses() {
        let api = |status| ProviderRequestError::Api {
            status,
            body: String::new(),
        };
        assert!(api(StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(api(StatusCode::BAD_GATEWAY).is_transient());
        assert!(!api(StatusCode::UNAUTHORIZED).is_transient());
        assert!(!api(StatusCode::BAD_REQUEST).is_transient());
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let mut calls = 0;
        let result: LLMResult<()> = with_retries("test", 3, || {
            calls += 1;
            async {
                Err(ProviderRequestError::Api {
                    status: StatusCode::UNAUTHORIZED,
                    body: "bad key".to_string(),
                })
            }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(calls, 1);
        assert_eq!(err.to_string(), "test API error (401 Unauthorized): bad key");
    }

    #[test]
    fn test_message_role_serialization() {
        let value = serde_json::to_value(Message::system("x")).unwrap();
        assert_eq!(value["role"], "system");
        assert_eq!(MessageRole::Assistant.to_string(), "assistant");
    }
}
