//! Hash-chain arithmetic: `hash = SHA-256(previousHash || canonicalJSON(event minus {hash}))`.

use crate::canonical::canonical_json;
use schemas::{AuditEvent, EngineError, Result};
use sha2::{Digest, Sha256};

/// The fields that participate in the hash, everything except `hash` itself.
#[derive(serde::Serialize)]
struct Hashable<'a> {
    id: &'a uuid::Uuid,
    sequence: u64,
    timestamp: &'a chrono::DateTime<chrono::Utc>,
    category: &'a str,
    action: &'a str,
    severity: schemas::Severity,
    outcome: schemas::AuditOutcome,
    actor: &'a schemas::Actor,
    target: &'a Option<String>,
    description: &'a str,
    details: &'a Option<serde_json::Value>,
    error: &'a Option<schemas::AuditError>,
    previous_hash: &'a str,
}

pub fn compute_hash(event: &AuditEvent) -> Result<String> {
    let hashable = Hashable {
        id: &event.id,
        sequence: event.sequence,
        timestamp: &event.timestamp,
        category: &event.category,
        action: &event.action,
        severity: event.severity,
        outcome: event.outcome,
        actor: &event.actor,
        target: &event.target,
        description: &event.description,
        details: &event.details,
        error: &event.error,
        previous_hash: &event.previous_hash,
    };
    let canonical = canonical_json(&hashable)?;
    let mut hasher = Sha256::new();
    hasher.update(event.previous_hash.as_bytes());
    hasher.update(canonical.as_bytes());
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn verify_link(previous: &AuditEvent, current: &AuditEvent) -> Result<()> {
    if current.previous_hash != previous.hash {
        return Err(EngineError::IntegrityError(format!(
            "event {} previousHash does not match event {}'s hash",
            current.sequence, previous.sequence
        )));
    }
    let expected = compute_hash(current)?;
    if expected != current.hash {
        return Err(EngineError::IntegrityError(format!(
            "event {} hash does not match its recomputed value",
            current.sequence
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use schemas::{Actor, ActorType, AuditOutcome, Severity, GENESIS_HASH};
    use uuid::Uuid;

    fn event(sequence: u64, previous_hash: &str) -> AuditEvent {
        let mut event = AuditEvent {
            id: Uuid::new_v4(),
            sequence,
            timestamp: Utc::now(),
            category: "workflow".to_string(),
            action: "task_created".to_string(),
            severity: Severity::Info,
            outcome: AuditOutcome::Success,
            actor: Actor {
                actor_type: ActorType::System,
                id: "engine".to_string(),
            },
            target: None,
            description: "created".to_string(),
            details: None,
            error: None,
            previous_hash: previous_hash.to_string(),
            hash: String::new(),
        };
        event.hash = compute_hash(&event).unwrap();
        event
    }

    #[test]
    fn hash_is_deterministic() {
        let event = event(0, GENESIS_HASH);
        let recomputed = compute_hash(&event).unwrap();
        assert_eq!(recomputed, event.hash);
    }

    #[test]
    fn changing_any_field_changes_hash() {
        let a = event(0, GENESIS_HASH);
        let mut b = a.clone();
        b.description = "different".to_string();
        let hash_b = compute_hash(&b).unwrap();
        assert_ne!(a.hash, hash_b);
    }

    #[test]
    fn verify_link_accepts_valid_chain() {
        let first = event(0, GENESIS_HASH);
        let second = event(1, &first.hash);
        assert!(verify_link(&first, &second).is_ok());
    }

    #[test]
    fn verify_link_rejects_broken_previous_hash() {
        let first = event(0, GENESIS_HASH);
        let mut second = event(1, &first.hash);
        second.previous_hash = "f".repeat(64);
        assert!(verify_link(&first, &second).is_err());
    }

    #[test]
    fn verify_link_rejects_tampered_hash() {
        let first = event(0, GENESIS_HASH);
        let mut second = event(1, &first.hash);
        second.hash = "a".repeat(64);
        assert!(verify_link(&first, &second).is_err());
    }
}
