//! Inputs and outputs of a single routing decision.

use schemas::{AgentId, Phase, TaskClassification};

#[derive(Debug, Clone)]
pub struct DecisionContext {
    pub task_classification: Option<TaskClassification>,
    pub phase: Phase,
    pub has_failures: bool,
    pub failure_count: u32,
    pub needs_approval: bool,
    pub security_concern: bool,
    pub completed_agents: Vec<AgentId>,
    pub total_tokens_used: u64,
}

impl DecisionContext {
    pub fn classification(&self) -> TaskClassification {
        self.task_classification
            .clone()
            .unwrap_or_else(TaskClassification::conservative_default)
    }

    pub fn has_completed(&self, agent: AgentId) -> bool {
        self.completed_agents.contains(&agent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionAction {
    Route(AgentId),
    Pause,
    Complete,
    Escalate,
    Abort,
}

#[derive(Debug, Clone)]
pub struct RoutingDecision {
    pub action: DecisionAction,
    pub reason: String,
    pub priority: u8,
    /// Context type names the router should prioritize for this hop; the
    /// agent's own declared `RequiredContext` list still governs curation.
    pub context_requirements: Vec<String>,
    pub alternative_agents: Vec<AgentId>,
}

impl RoutingDecision {
    pub fn new(action: DecisionAction, reason: impl Into<String>, priority: u8) -> Self {
        Self {
            action,
            reason: reason.into(),
            priority,
            context_requirements: Vec::new(),
            alternative_agents: Vec::new(),
        }
    }
}
