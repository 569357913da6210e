//! Provider error taxonomy
//!
//! Every failure a backend can produce funnels into one of these three
//! variants. None of them ever escapes [`GenerationRouter::generate`];
//! the router converts them into a fallback attempt or a terminal error
//! fragment.
//!
//! [`GenerationRouter::generate`]: crate::providers::GenerationRouter::generate

use thiserror::Error;

/// Errors produced by provider backends and the router's provider lookup
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credentials missing or the backend was never constructed
    #[error("provider {0} is not configured (missing credentials)")]
    Unavailable(String),

    /// The network/service call failed: timeout, 4xx/5xx, malformed payload
    #[error("provider {provider} call failed: {detail}")]
    CallFailed { provider: String, detail: String },

    /// The provider kind has no implemented backend
    #[error("provider {0} has no implemented backend")]
    Unsupported(String),
}

impl ProviderError {
    /// Shorthand for a call failure with an owned detail string
    pub fn call_failed(provider: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::CallFailed {
            provider: provider.into(),
            detail: detail.into(),
        }
    }

    /// The provider this error originated from
    pub fn provider(&self) -> &str {
        match self {
            Self::Unavailable(p) => p,
            Self::CallFailed { provider, .. } => provider,
            Self::Unsupported(p) => p,
        }
    }
}
