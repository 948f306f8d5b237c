//! The append-only, hash-chained audit log.

use crate::chain::{compute_hash, verify_link};
use chrono::{DateTime, Utc};
use schemas::{
    Actor, AuditError, AuditEvent, AuditOutcome, EngineError, Result, Severity, GENESIS_HASH,
};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

/// The fields a caller supplies to `log`; sequence/id/timestamp/hashes are
/// assigned by the log itself.
#[derive(Debug, Clone)]
pub struct NewAuditEvent {
    pub category: String,
    pub action: String,
    pub severity: Severity,
    pub outcome: AuditOutcome,
    pub actor: Actor,
    pub target: Option<String>,
    pub description: String,
    pub details: Option<serde_json::Value>,
    pub error: Option<AuditError>,
}

impl NewAuditEvent {
    pub fn new(
        category: impl Into<String>,
        action: impl Into<String>,
        severity: Severity,
        outcome: AuditOutcome,
        actor: Actor,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            action: action.into(),
            severity,
            outcome,
            actor,
            target: None,
            description: description.into(),
            details: None,
            error: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_error(mut self, error: AuditError) -> Self {
        self.error = Some(error);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub categories: Option<Vec<String>>,
    pub min_severity: Option<Severity>,
    pub max_severity: Option<Severity>,
    pub outcomes: Option<Vec<AuditOutcome>>,
    pub actor_id: Option<String>,
    pub target_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl QueryOptions {
    fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(start) = self.start {
            if event.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if event.timestamp > end {
                return false;
            }
        }
        if let Some(categories) = &self.categories {
            if !categories.contains(&event.category) {
                return false;
            }
        }
        if let Some(min) = self.min_severity {
            if event.severity < min {
                return false;
            }
        }
        if let Some(max) = self.max_severity {
            if event.severity > max {
                return false;
            }
        }
        if let Some(outcomes) = &self.outcomes {
            if !outcomes.contains(&event.outcome) {
                return false;
            }
        }
        if let Some(actor_id) = &self.actor_id {
            if &event.actor.id != actor_id {
                return false;
            }
        }
        if let Some(target_id) = &self.target_id {
            if event.target.as_ref() != Some(target_id) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct IntegrityReport {
    pub valid: bool,
    pub checked_events: usize,
    pub invalid_events: Vec<u64>,
    pub chain_broken: bool,
    pub chain_break_point: Option<u64>,
}

struct Inner {
    events: Vec<AuditEvent>,
    file: Option<std::fs::File>,
}

/// Single-writer lane: the internal lock naturally serializes concurrent
/// `log` calls FIFO, matching the strict-serialization requirement on the
/// audit chain.
pub struct AuditLog {
    inner: parking_lot::Mutex<Inner>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            inner: parking_lot::Mutex::new(Inner {
                events: Vec::new(),
                file: None,
            }),
        }
    }

    /// Persists every logged event as an appended JSONL line under `path`,
    /// in addition to keeping the in-memory chain.
    pub fn with_persist_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| EngineError::UpstreamError(format!("create audit dir: {e}")))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| EngineError::UpstreamError(format!("open audit file: {e}")))?;
        Ok(Self {
            inner: parking_lot::Mutex::new(Inner {
                events: Vec::new(),
                file: Some(file),
            }),
        })
    }

    pub fn log(&self, event: NewAuditEvent) -> Result<AuditEvent> {
        if event.description.chars().count() > schemas::MAX_DESCRIPTION_CHARS {
            return Err(EngineError::ValidationFailure(format!(
                "audit description exceeds {} characters",
                schemas::MAX_DESCRIPTION_CHARS
            )));
        }

        let details = event.details.map(|d| utils::redact_value(&d));
        let error = event.error.map(|e| AuditError {
            code: e.code,
            message: utils::redact_str(&e.message),
        });

        let mut inner = self.inner.lock();
        let sequence = inner.events.len() as u64;
        let previous_hash = inner
            .events
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        let mut record = AuditEvent {
            id: Uuid::new_v4(),
            sequence,
            timestamp: Utc::now(),
            category: event.category,
            action: event.action,
            severity: event.severity,
            outcome: event.outcome,
            actor: event.actor,
            target: event.target,
            description: event.description,
            details,
            error,
            previous_hash,
            hash: String::new(),
        };
        record.hash = compute_hash(&record)?;

        let size = serde_json::to_vec(&record)
            .map_err(|e| EngineError::ValidationFailure(e.to_string()))?
            .len();
        if size > schemas::MAX_EVENT_BYTES {
            return Err(EngineError::ValidationFailure(format!(
                "audit event exceeds {} bytes",
                schemas::MAX_EVENT_BYTES
            )));
        }

        if let Some(file) = inner.file.as_mut() {
            let line = serde_json::to_string(&record)
                .map_err(|e| EngineError::ValidationFailure(e.to_string()))?;
            writeln!(file, "{line}")
                .map_err(|e| EngineError::UpstreamError(format!("write audit line: {e}")))?;
        }

        inner.events.push(record.clone());
        Ok(record)
    }

    pub fn query(&self, options: &QueryOptions) -> Vec<AuditEvent> {
        let inner = self.inner.lock();
        let mut matched: Vec<AuditEvent> = inner
            .events
            .iter()
            .filter(|e| options.matches(e))
            .cloned()
            .collect();
        matched.sort_by_key(|e| e.sequence);
        let start = options.offset.min(matched.len());
        let end = options
            .limit
            .map(|limit| (start + limit).min(matched.len()))
            .unwrap_or(matched.len());
        matched[start..end].to_vec()
    }

    pub fn verify_integrity(&self, range: Option<(u64, u64)>) -> IntegrityReport {
        let inner = self.inner.lock();
        let events: Vec<&AuditEvent> = match range {
            Some((start, end)) => inner
                .events
                .iter()
                .filter(|e| e.sequence >= start && e.sequence <= end)
                .collect(),
            None => inner.events.iter().collect(),
        };

        let mut invalid_events = Vec::new();
        let mut chain_broken = false;
        let mut chain_break_point = None;

        for window in events.windows(2) {
            let (previous, current) = (window[0], window[1]);
            if verify_link(previous, current).is_err() {
                invalid_events.push(current.sequence);
                if !chain_broken {
                    chain_broken = true;
                    chain_break_point = Some(current.sequence);
                }
            }
        }
        if let Some(first) = events.first() {
            if first.sequence == 0 && first.previous_hash != GENESIS_HASH {
                invalid_events.push(first.sequence);
                chain_broken = true;
                chain_break_point = Some(first.sequence);
            }
        }

        IntegrityReport {
            valid: invalid_events.is_empty(),
            checked_events: events.len(),
            invalid_events,
            chain_broken,
            chain_break_point,
        }
    }

    /// Update is forbidden for an append-only log.
    pub fn update(&self, _id: Uuid) -> Result<()> {
        Err(EngineError::InvariantViolation(
            "audit events are immutable once logged".to_string(),
        ))
    }

    /// Delete is forbidden for an append-only log.
    pub fn delete(&self, _id: Uuid) -> Result<()> {
        Err(EngineError::InvariantViolation(
            "audit events cannot be deleted".to_string(),
        ))
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
