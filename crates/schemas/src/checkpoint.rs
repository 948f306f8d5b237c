//! `Checkpoint` and its four snapshots.
//!
//! This module only carries the data shapes. Hashing, redaction, and the
//! write-then-rename persistence path live in the checkpoint store crate,
//! which depends on this one.

use crate::task::{AgentId, Phase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckpointTrigger {
    Manual,
    StateTransition,
    AgentComplete,
    BeforeDestructive,
    TimeInterval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    Valid,
    Corrupted,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub current_state: Phase,
    pub previous_state: Option<Phase>,
    /// Append-only, most-recent-first, truncated to the last 100 transitions.
    pub history: Vec<PhaseTransition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshotEntry {
    pub status: AgentRunStatus,
    pub input: serde_json::Value,
    /// Redacted copy of the agent's output payload.
    pub output_redacted: Option<serde_json::Value>,
    pub attempts: u32,
    pub tokens: u32,
}

/// Keyed by `AgentId::to_string()` rather than the enum directly — JSON map
/// keys must be strings, and this avoids a custom `Serialize` impl for the key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentsSnapshot {
    pub entries: HashMap<String, AgentSnapshotEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub task_description: String,
    pub artifact_checksums: HashMap<String, String>,
    pub lessons: Vec<String>,
    pub decisions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilesystemSnapshot {
    pub modified: Vec<String>,
    pub created: Vec<String>,
    pub deleted: Vec<String>,
}

/// Per-snapshot SHA-256 checksums (first 16 hex chars) plus an overall
/// checksum computed over all four.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityBlock {
    pub workflow_checksum: String,
    pub agents_checksum: String,
    pub context_checksum: String,
    pub filesystem_checksum: String,
    pub overall_checksum: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoveryBlock {
    pub can_resume: bool,
    pub resume_from_agent: Option<AgentId>,
    pub resume_from_state: Option<Phase>,
    pub blockers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub trigger: CheckpointTrigger,
    pub status: CheckpointStatus,
    pub workflow: WorkflowSnapshot,
    pub agents: AgentsSnapshot,
    pub context: ContextSnapshot,
    pub filesystem: FilesystemSnapshot,
    pub integrity: IntegrityBlock,
    pub recovery: RecoveryBlock,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_transition_history_ordering_is_caller_responsibility() {
        let history = vec![
            PhaseTransition {
                from: Phase::Analyzing,
                to: Phase::Planning,
                at: Utc::now(),
            },
            PhaseTransition {
                from: Phase::Planning,
                to: Phase::Building,
                at: Utc::now(),
            },
        ];
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn recovery_block_default_cannot_resume() {
        let recovery = RecoveryBlock::default();
        assert!(!recovery.can_resume);
        assert!(recovery.blockers.is_empty());
    }
}
