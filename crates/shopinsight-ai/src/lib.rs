pub mod completion;
pub mod llm_factory;
pub mod llm_provider;
pub mod openai_provider;
pub mod prompts;

// Cloud LLM providers
#[cfg(feature = "anthropic")]
pub mod anthropic_provider;

pub use completion::*;
pub use llm_factory::LLMProviderFactory;
pub use llm_provider::*;
pub use prompts::*;
