//! `AuthContext`: the opaque identity the router and decision engine
//! validate before doing anything tenant-sensitive.

use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub tenant_id: String,
    pub user_id: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthContext {
    pub fn new(
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// `tenantId`, `userId`, `sessionId` non-empty; `expiresAt` (if present)
    /// not in the past. Callers that fail this must treat it as a
    /// `SecurityViolation`, never a plain validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.tenant_id.is_empty() || self.user_id.is_empty() || self.session_id.is_empty() {
            return Err(EngineError::SecurityViolation(
                "auth context missing tenant, user, or session id".to_string(),
            ));
        }
        if let Some(expires_at) = self.expires_at {
            if expires_at < Utc::now() {
                return Err(EngineError::SecurityViolation(
                    "auth context has expired".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn rejects_empty_fields() {
        let auth = AuthContext::new("", "user-1", "session-1");
        assert!(auth.validate().is_err());
    }

    #[test]
    fn rejects_expired_auth() {
        let auth = AuthContext::new("tenant-1", "user-1", "session-1")
            .with_expiry(Utc::now() - Duration::seconds(1));
        assert!(auth.validate().is_err());
    }

    #[test]
    fn accepts_well_formed_unexpired_auth() {
        let auth = AuthContext::new("tenant-1", "user-1", "session-1")
            .with_expiry(Utc::now() + Duration::hours(1));
        assert!(auth.validate().is_ok());
    }

    #[test]
    fn accepts_auth_without_expiry() {
        let auth = AuthContext::new("tenant-1", "user-1", "session-1");
        assert!(auth.validate().is_ok());
    }
}
