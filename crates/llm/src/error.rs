//! Error taxonomy for the provider boundary.
//!
//! Every variant maps to one of the outcomes a caller needs to act on: retry
//! immediately, retry after a delay, re-authenticate, or give up. `is_retryable`
//! collapses that decision into a single bool so the executor's backoff loop
//! doesn't need to match on variants.

use thiserror::Error;

/// Result type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after_ms: Option<u64>,
    },

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("upstream provider error (status {status:?}): {message}")]
    UpstreamError {
        status: Option<u16>,
        message: String,
    },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("provider not configured: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// Whether the executor's retry loop should back off and try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } | LlmError::Timeout(_) | LlmError::Transport(_) => true,
            LlmError::UpstreamError { status, .. } => status.map(|s| s >= 500).unwrap_or(true),
            _ => false,
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, LlmError::AuthenticationFailed(_))
    }

    /// Redact the message before it crosses the provider boundary into logs,
    /// activity events, or checkpoints.
    pub fn redacted(&self) -> String {
        utils::redact_str(&self.to_string())
    }
}
