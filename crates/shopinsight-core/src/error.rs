use crate::types::Domain;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShopInsightError {
    /// The generated query failed the safety gate.
    #[error("Generated invalid ShopifyQL: {query}")]
    QueryValidation { query: String },

    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    #[error("Platform fetch failed for {domain}: {cause}")]
    PlatformFetch { domain: Domain, cause: String },

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ShopInsightError {
    /// Errors caused by the question or the generated query rather than a
    /// failing dependency.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ShopInsightError::QueryValidation { .. } | ShopInsightError::UnknownDomain(_)
        )
    }

    /// Errors raised by an external service the pipeline depends on.
    pub fn is_downstream_error(&self) -> bool {
        matches!(
            self,
            ShopInsightError::PlatformFetch { .. } | ShopInsightError::Completion(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ShopInsightError>;
