//! The error taxonomy shared by every component in the engine.
//!
//! Every failure surfaced above the provider boundary is one of these eight
//! variants. Components don't invent their own error enums on top of this —
//! a dependency-graph conflict, a checkpoint checksum mismatch, and an audit
//! chain break are all instances of one of these, distinguished by the
//! `detail` payload rather than by a new type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Input did not satisfy a schema or invariant. Surface immediately, no retry.
    #[error("validation failure: {0}")]
    ValidationFailure(String),

    /// Auth missing/expired, cross-tenant access, path traversal, injection
    /// indicator. Abort, no retry, always audited.
    #[error("security violation: {0}")]
    SecurityViolation(String),

    /// Missing agent, missing checkpoint, unknown id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate id, circular dependency.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Provider or external store failure. May be retried per policy.
    #[error("upstream error: {0}")]
    UpstreamError(String),

    /// Deadline exceeded. Counts as recoverable.
    #[error("operation timed out after {elapsed_ms}ms (deadline {deadline_ms}ms)")]
    OperationTimeout { elapsed_ms: u64, deadline_ms: u64 },

    /// Checksum mismatch, broken hash chain. Non-recoverable, escalate.
    #[error("integrity error: {0}")]
    IntegrityError(String),

    /// Audit update/delete, write to a sealed registry. Programmer error.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    /// Structured, caller-facing representation per the error-handling design:
    /// `{code, message (redacted), correlationId, recoverable}`.
    pub fn to_failure(&self, correlation_id: impl Into<String>) -> Failure {
        Failure {
            code: self.code().to_string(),
            message: utils::redact_str(&self.to_string()),
            correlation_id: correlation_id.into(),
            recoverable: self.is_recoverable(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            EngineError::ValidationFailure(_) => "VALIDATION_FAILURE",
            EngineError::SecurityViolation(_) => "SECURITY_VIOLATION",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::Conflict(_) => "CONFLICT",
            EngineError::UpstreamError(_) => "UPSTREAM_ERROR",
            EngineError::OperationTimeout { .. } => "OPERATION_TIMEOUT",
            EngineError::IntegrityError(_) => "INTEGRITY_ERROR",
            EngineError::InvariantViolation(_) => "INVARIANT_VIOLATION",
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::UpstreamError(_) | EngineError::OperationTimeout { .. }
        )
    }
}

/// The structured shape every error takes once it reaches a caller.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Failure {
    pub code: String,
    pub message: String,
    pub correlation_id: String,
    pub recoverable: bool,
}
