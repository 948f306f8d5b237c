//! The `Task` aggregate and its classification.

use crate::error::{EngineError, Result};
use crate::ids;
use serde::{Deserialize, Serialize};

/// A specialized worker, identified by a fixed enum value rather than a
/// free-form string — new agent types are a code change, not config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    Orchestrator,
    Planner,
    Architect,
    UiDesigner,
    FrontendDev,
    BackendDev,
    Tester,
    BugFixer,
    Reviewer,
    Compliance,
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Feature,
    Bugfix,
    Refactor,
    Research,
    Deployment,
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Trivial,
    Simple,
    Moderate,
    Complex,
    Epic,
}

/// The enumerated workflow phases. `Complete`, `Failed` are strictly
/// terminal; `Paused` is terminal-with-resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Analyzing,
    Planning,
    Designing,
    Building,
    Testing,
    Reviewing,
    Complete,
    Paused,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::Paused | Phase::Failed)
    }

    pub fn can_resume(self) -> bool {
        matches!(self, Phase::Paused)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalOutcome {
    Success,
    Failed,
    Aborted,
    Escalated,
}

/// Output of `analyze(prompt)`: the classification a task receives before
/// the workflow loop begins routing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskClassification {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub complexity: Complexity,
    #[serde(default)]
    pub requires_design: bool,
    #[serde(default)]
    pub requires_architecture: bool,
    #[serde(default)]
    pub requires_compliance: bool,
    pub confidence: f32,
}

impl TaskClassification {
    /// The conservative default used when the provider's classification
    /// response fails to parse.
    pub fn conservative_default() -> Self {
        Self {
            task_type: TaskType::Feature,
            complexity: Complexity::Moderate,
            requires_design: false,
            requires_architecture: false,
            requires_compliance: false,
            confidence: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(EngineError::ValidationFailure(format!(
                "classification confidence {} out of range [0,1]",
                self.confidence
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub tenant_id: String,
    pub project_id: String,
    pub prompt: String,
    pub classification: Option<TaskClassification>,
    pub phase: Phase,
    pub retry_count: u32,
    pub iteration_count: u32,
    pub completed_agents: Vec<AgentId>,
    pub outcome: Option<TerminalOutcome>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        project_id: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Result<Self> {
        let id = id.into();
        ids::validate_prefixed_id(&id)?;
        Ok(Self {
            id,
            tenant_id: tenant_id.into(),
            project_id: project_id.into(),
            prompt: prompt.into(),
            classification: None,
            phase: Phase::Analyzing,
            retry_count: 0,
            iteration_count: 0,
            completed_agents: Vec::new(),
            outcome: None,
        })
    }

    pub fn mark_completed(&mut self, agent: AgentId) {
        self.completed_agents.push(agent);
        self.retry_count = 0;
    }
}
