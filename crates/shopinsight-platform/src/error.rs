use shopinsight_core::{Domain, ShopInsightError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("request to {domain} endpoint failed: {source}")]
    Request {
        domain: Domain,
        #[source]
        source: reqwest::Error,
    },

    #[error("{domain} endpoint returned {status}: {body}")]
    Status {
        domain: Domain,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{domain} response could not be decoded: {reason}")]
    Decode { domain: Domain, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl PlatformError {
    pub fn domain(&self) -> Option<Domain> {
        match self {
            PlatformError::Request { domain, .. }
            | PlatformError::Status { domain, .. }
            | PlatformError::Decode { domain, .. } => Some(*domain),
            PlatformError::Client(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PlatformError::Request { source, .. } if source.is_timeout())
    }
}

impl From<PlatformError> for ShopInsightError {
    fn from(err: PlatformError) -> Self {
        match err.domain() {
            Some(domain) => ShopInsightError::PlatformFetch {
                domain,
                cause: err.to_string(),
            },
            None => ShopInsightError::Config(err.to_string()),
        }
    }
}
