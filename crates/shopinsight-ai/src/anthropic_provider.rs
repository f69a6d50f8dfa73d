use crate::llm_provider::*;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: ANTHROPIC_API_BASE.to_string(),
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

/// Messages API client. System messages are sent through the top-level
/// `system` field since the API rejects them inside `messages`.
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(anyhow!(
                "Anthropic API key is required. Set 'anthropic_api_key' or ANTHROPIC_API_KEY."
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    fn messages_request<'a>(
        &'a self,
        messages: &'a [Message],
        config: &'a GenerationConfig,
    ) -> MessagesRequest<'a> {
        let system = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>();

        MessagesRequest {
            model: &self.config.model,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: messages
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .map(|m| TurnMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            max_tokens: config.max_tokens.unwrap_or(1024),
            temperature: config.temperature,
            stop_sequences: config.stop.as_deref(),
        }
    }

    async fn post_messages(
        &self,
        request: &MessagesRequest<'_>,
    ) -> Result<MessagesResponse, ProviderRequestError> {
        let response = self
            .client
            .post(format!("{}/messages", self.config.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;
        read_json(response).await
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let request = self.messages_request(messages, config);
        let response = with_retries("anthropic", self.config.max_retries, || {
            self.post_messages(&request)
        })
        .await?;

        let content: String = response
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        Ok(LLMResponse {
            content,
            total_tokens: Some(response.usage.input_tokens + response.usage.output_tokens),
            prompt_tokens: Some(response.usage.input_tokens),
            completion_tokens: Some(response.usage.output_tokens),
            finish_reason: response.stop_reason,
            model: response.model,
        })
    }

    async fn is_available(&self) -> bool {
        let probe = GenerationConfig {
            max_tokens: Some(1),
            ..Default::default()
        };
        self.generate_chat(&[Message::user("ping")], &probe)
            .await
            .is_ok()
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<TurnMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
struct TurnMessage<'a> {
    role: MessageRole,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: TokenUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenUsage {
    input_tokens: usize,
    output_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn provider_for(base_url: String, max_retries: u32) -> AnthropicProvider {
        AnthropicProvider::new(AnthropicConfig {
            base_url,
            max_retries,
            ..AnthropicConfig::new("test-key")
        })
        .unwrap()
    }

    #[test]
    fn test_provider_creation_requires_api_key() {
        assert!(AnthropicProvider::new(AnthropicConfig::new("  ")).is_err());
    }

    #[tokio::test]
    async fn test_system_message_is_lifted() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .match_body(Matcher::PartialJsonString(
                r#"{"system": "be brief", "messages": [{"role": "user", "content": "hi"}]}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_body(
                r#"{
                "content": [{"type": "text", "text": "hel"}, {"type": "text", "text": "lo"}],
                "model": "claude-3-5-sonnet-20241022",
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 4, "output_tokens": 2}
            }"#,
            )
            .create_async()
            .await;

        let response = provider_for(server.url(), 0)
            .generate_chat(
                &[Message::system("be brief"), Message::user("hi")],
                &GenerationConfig::default(),
            )
            .await
            .unwrap();

        assert_eq!(response.content, "hello");
        assert_eq!(response.total_tokens, Some(6));
        assert_eq!(response.finish_reason.as_deref(), Some("end_turn"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .with_status(401)
            .with_body(r#"{"error": {"type": "authentication_error"}}"#)
            .expect(1)
            .create_async()
            .await;

        let err = provider_for(server.url(), 2)
            .generate("hi")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("401"));
        mock.assert_async().await;
    }
}
