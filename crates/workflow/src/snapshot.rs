//! Builds the four checkpoint snapshots from the engine's in-memory state.

use schemas::{
    AgentId, AgentOutput, AgentRunStatus, AgentSnapshotEntry, AgentsSnapshot, ContextSnapshot,
    FilesystemSnapshot, Phase, PhaseTransition, Task, WorkflowSnapshot,
};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

fn sha256_hex(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

pub const MAX_PHASE_HISTORY: usize = 100;

/// Most-recent-first, capped history of phase transitions.
#[derive(Debug, Clone, Default)]
pub struct PhaseHistory {
    transitions: Vec<PhaseTransition>,
}

impl PhaseHistory {
    pub fn record(&mut self, from: Phase, to: Phase) {
        self.transitions.insert(
            0,
            PhaseTransition {
                from,
                to,
                at: chrono::Utc::now(),
            },
        );
        self.transitions.truncate(MAX_PHASE_HISTORY);
    }

    pub fn as_slice(&self) -> &[PhaseTransition] {
        &self.transitions
    }

    /// Rebuilds a history from a checkpoint's stored transitions, e.g. when
    /// resuming a workflow.
    pub fn from_transitions(transitions: Vec<PhaseTransition>) -> Self {
        let mut history = Self { transitions };
        history.transitions.truncate(MAX_PHASE_HISTORY);
        history
    }
}

pub fn workflow_snapshot(task: &Task, history: &PhaseHistory) -> WorkflowSnapshot {
    WorkflowSnapshot {
        current_state: task.phase,
        previous_state: history.transitions.first().map(|t| t.from),
        history: history.transitions.clone(),
    }
}

/// Folds the output history into one entry per agent: the latest attempt's
/// status/output, with attempts and tokens accumulated across every attempt.
pub fn agents_snapshot(outputs: &[AgentOutput]) -> AgentsSnapshot {
    let mut entries: HashMap<String, AgentSnapshotEntry> = HashMap::new();
    for output in outputs {
        let key = output.agent.to_string();
        let status = if output.success {
            AgentRunStatus::Succeeded
        } else {
            AgentRunStatus::Failed
        };
        let redacted = utils::redact_value(&output.result);
        let entry = entries.entry(key).or_insert_with(|| AgentSnapshotEntry {
            status,
            input: serde_json::Value::Null,
            output_redacted: None,
            attempts: 0,
            tokens: 0,
        });
        entry.status = status;
        entry.output_redacted = Some(redacted);
        entry.attempts += 1;
        entry.tokens += output.token_usage.total();
    }
    AgentsSnapshot { entries }
}

pub fn context_snapshot(task: &Task, outputs: &[AgentOutput]) -> ContextSnapshot {
    let mut artifact_checksums = HashMap::new();
    for output in outputs {
        for artifact in &output.artifacts {
            let checksum = artifact.content.as_deref().map(sha256_hex).unwrap_or_default();
            artifact_checksums.insert(artifact.id.clone(), checksum);
        }
    }
    ContextSnapshot {
        task_description: task.prompt.clone(),
        artifact_checksums,
        lessons: Vec::new(),
        decisions: Vec::new(),
    }
}

pub fn filesystem_snapshot(outputs: &[AgentOutput]) -> FilesystemSnapshot {
    let mut created = Vec::new();
    for output in outputs {
        for artifact in &output.artifacts {
            if !created.contains(&artifact.path) {
                created.push(artifact.path.clone());
            }
        }
    }
    FilesystemSnapshot {
        modified: Vec::new(),
        created,
        deleted: Vec::new(),
    }
}

/// Best-effort mapping from the agent just routed to onto the workflow
/// phase it represents, used to advance `task.phase` after a successful run.
pub fn phase_for_agent(agent: AgentId) -> Option<Phase> {
    match agent {
        AgentId::Orchestrator | AgentId::Planner => Some(Phase::Planning),
        AgentId::Architect | AgentId::UiDesigner | AgentId::Compliance => Some(Phase::Designing),
        AgentId::FrontendDev | AgentId::BackendDev | AgentId::BugFixer => Some(Phase::Building),
        AgentId::Tester => Some(Phase::Testing),
        AgentId::Reviewer => Some(Phase::Reviewing),
    }
}
