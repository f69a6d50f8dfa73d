use crate::completion::{CompletionProvider, LLMCompletion};
use crate::llm_provider::*;
use crate::openai_provider::{OpenAIConfig, OpenAIProvider, DEFAULT_OPENAI_MODEL};
use anyhow::{anyhow, Result};
use shopinsight_core::LLMConfig;
use std::sync::Arc;

#[cfg(feature = "anthropic")]
use crate::anthropic_provider::{AnthropicConfig, AnthropicProvider};

/// Factory for creating LLM providers based on configuration
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration
    pub fn create_from_config(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let provider_name = config.provider.to_lowercase();

        match provider_name.as_str() {
            "openai" => Self::create_openai_provider(config),
            "openai-compatible" => Self::create_openai_compatible_provider(config),
            #[cfg(feature = "anthropic")]
            "anthropic" => Self::create_anthropic_provider(config),
            _ => Err(anyhow!(
                "Unsupported LLM provider: {}. Available providers: {}",
                provider_name,
                Self::supported_providers().join(", ")
            )),
        }
    }

    /// Create the completion capability used by the analytics pipeline
    pub fn create_completion(config: &LLMConfig) -> Result<Arc<dyn CompletionProvider>> {
        let provider = Self::create_from_config(config)?;
        let generation = GenerationConfig {
            temperature: config.temperature,
            max_tokens: Some(config.max_tokens),
            ..Default::default()
        };
        Ok(Arc::new(LLMCompletion::with_config(provider, generation)))
    }

    /// Create an OpenAI provider
    fn create_openai_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let api_key = config.openai_api_key.clone().ok_or_else(|| {
            anyhow!(
                "OpenAI API key not found. Set 'openai_api_key' in config \
                 or OPENAI_API_KEY environment variable"
            )
        })?;

        let mut openai_config = OpenAIConfig::new(api_key);
        openai_config.timeout_secs = config.timeout_secs;
        openai_config.max_retries = config.max_retries;
        openai_config.organization = config.openai_organization.clone();
        if let Some(model) = &config.model {
            openai_config.model = model.clone();
        }
        if let Some(base_url) = &config.base_url {
            openai_config.base_url = base_url.clone();
        }

        Ok(Arc::new(OpenAIProvider::new(openai_config)?))
    }

    /// Create an OpenAI-compatible provider
    fn create_openai_compatible_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let base_url = config.base_url.clone().ok_or_else(|| {
            anyhow!("OpenAI-compatible base URL not found. Set 'base_url' in config")
        })?;

        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("Model name is required for OpenAI-compatible provider"))?;

        let compat_config = OpenAIConfig {
            api_key: config.openai_api_key.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            ..OpenAIConfig::compatible(base_url, model)
        };

        Ok(Arc::new(OpenAIProvider::new(compat_config)?))
    }

    /// Create an Anthropic Claude provider
    #[cfg(feature = "anthropic")]
    fn create_anthropic_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        let api_key = config.anthropic_api_key.clone().ok_or_else(|| {
            anyhow!(
                "Anthropic API key not found. Set 'anthropic_api_key' in config \
                 or ANTHROPIC_API_KEY environment variable"
            )
        })?;

        let mut anthropic_config = AnthropicConfig::new(api_key);
        anthropic_config.timeout_secs = config.timeout_secs;
        anthropic_config.max_retries = config.max_retries;
        if let Some(model) = &config.model {
            anthropic_config.model = model.clone();
        }
        if let Some(base_url) = &config.base_url {
            anthropic_config.base_url = base_url.clone();
        }

        Ok(Arc::new(AnthropicProvider::new(anthropic_config)?))
    }

    /// Get a list of supported providers (based on enabled features)
    pub fn supported_providers() -> Vec<&'static str> {
        #[allow(unused_mut)]
        let mut providers = vec!["openai", "openai-compatible"];

        #[cfg(feature = "anthropic")]
        providers.push("anthropic");

        providers
    }
}
