//! `AuditEvent`: the hash-chained, append-only compliance record.
//!
//! This module carries the event shape and the constants that pin its
//! invariants (genesis hash, description length cap). The chain-building
//! logic — computing `hash` from `previousHash` and the canonical JSON of
//! the rest of the event — lives in the audit log crate.

use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The first event in a chain uses this literal in place of a real `hash`.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Spec pins this to 64 hex chars; the literal above is checked in tests
/// rather than trusted by construction, since it's hand-typed.
pub const HASH_HEX_LEN: usize = 64;

pub const MAX_DESCRIPTION_CHARS: usize = 10_000;
pub const MAX_EVENT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    User,
    Agent,
    System,
    External,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    #[serde(rename = "type")]
    pub actor_type: ActorType,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub action: String,
    pub severity: crate::activity::Severity,
    pub outcome: AuditOutcome,
    pub actor: Actor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AuditError>,
    pub previous_hash: String,
    pub hash: String,
}

impl AuditEvent {
    pub fn validate(&self) -> Result<()> {
        if self.description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(EngineError::ValidationFailure(format!(
                "audit description exceeds {MAX_DESCRIPTION_CHARS} characters"
            )));
        }
        let size = serde_json::to_vec(self)
            .map_err(|e| EngineError::ValidationFailure(e.to_string()))?
            .len();
        if size > MAX_EVENT_BYTES {
            return Err(EngineError::ValidationFailure(format!(
                "audit event exceeds {MAX_EVENT_BYTES} bytes"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_hash_is_64_hex_chars() {
        assert_eq!(GENESIS_HASH.len(), HASH_HEX_LEN);
        assert!(GENESIS_HASH.chars().all(|c| c == '0'));
    }

    fn sample_event(description: String) -> AuditEvent {
        AuditEvent {
            id: Uuid::new_v4(),
            sequence: 0,
            timestamp: Utc::now(),
            category: "workflow".to_string(),
            action: "task_created".to_string(),
            severity: crate::activity::Severity::Info,
            outcome: AuditOutcome::Success,
            actor: Actor {
                actor_type: ActorType::System,
                id: "engine".to_string(),
            },
            target: None,
            description,
            details: None,
            error: None,
            previous_hash: GENESIS_HASH.to_string(),
            hash: "a".repeat(64),
        }
    }

    #[test]
    fn validate_rejects_oversized_description() {
        let event = sample_event("x".repeat(MAX_DESCRIPTION_CHARS + 1));
        assert!(event.validate().is_err());
    }

    #[test]
    fn validate_accepts_normal_event() {
        let event = sample_event("task created".to_string());
        assert!(event.validate().is_ok());
    }
}
