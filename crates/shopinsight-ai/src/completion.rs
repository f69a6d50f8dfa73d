use crate::llm_provider::{GenerationConfig, LLMProvider, LLMResult};
use crate::prompts::{PromptTemplate, PromptVariables};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Text completion as the pipeline sees it: one fixed template, filled with
/// named values, returning free text.
///
/// Output is not guaranteed to follow the format the template asks for;
/// callers parse it and fall back when it does not.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        template: &PromptTemplate,
        variables: &PromptVariables,
    ) -> LLMResult<String>;
}

/// Adapts any [`LLMProvider`] to [`CompletionProvider`].
pub struct LLMCompletion {
    provider: Arc<dyn LLMProvider>,
    config: GenerationConfig,
}

impl LLMCompletion {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self::with_config(provider, GenerationConfig::default())
    }

    pub fn with_config(provider: Arc<dyn LLMProvider>, config: GenerationConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }
}

#[async_trait]
impl CompletionProvider for LLMCompletion {
    async fn complete(
        &self,
        template: &PromptTemplate,
        variables: &PromptVariables,
    ) -> LLMResult<String> {
        let prompt = template.render(variables)?;
        let start = Instant::now();

        let response = self
            .provider
            .generate_with_config(&prompt, &self.config)
            .await?;

        debug!(
            template = template.name,
            provider = self.provider.provider_name(),
            model = %response.model,
            tokens = ?response.total_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "completion finished"
        );

        Ok(response.content)
    }
}
