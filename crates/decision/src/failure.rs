//! Post-mortem strategy selection for a failing agent output.

use schemas::{AgentError, AgentId, AgentOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStrategy {
    Retry,
    Fix,
    Escalate,
    Abort,
    Skip,
}

#[derive(Debug, Clone)]
pub struct FailureAnalysis {
    pub strategy: FailureStrategy,
    pub reason: String,
    pub suggested_agent: Option<AgentId>,
    pub requires_user_input: bool,
}

impl FailureAnalysis {
    fn new(strategy: FailureStrategy, reason: impl Into<String>) -> Self {
        Self {
            strategy,
            reason: reason.into(),
            suggested_agent: None,
            requires_user_input: false,
        }
    }
}

pub fn analyze(output: &AgentOutput, failure_count: u32) -> FailureAnalysis {
    let Some(error) = output.error.as_ref() else {
        return FailureAnalysis::new(FailureStrategy::Retry, "no error recorded");
    };

    if error.code == AgentError::SECURITY_VIOLATION {
        let mut analysis = FailureAnalysis::new(FailureStrategy::Abort, "security violation reported");
        analysis.requires_user_input = true;
        return analysis;
    }

    if error.code == AgentError::TEST_FAILURE {
        let mut analysis = FailureAnalysis::new(FailureStrategy::Fix, "test failure reported");
        analysis.suggested_agent = Some(AgentId::BugFixer);
        return analysis;
    }

    if error.recoverable && failure_count < 3 {
        return FailureAnalysis::new(FailureStrategy::Retry, "recoverable error below retry ceiling");
    }

    if failure_count >= 3 {
        let mut analysis = FailureAnalysis::new(FailureStrategy::Escalate, "failure ceiling reached");
        analysis.requires_user_input = true;
        return analysis;
    }

    FailureAnalysis::new(FailureStrategy::Retry, "unclassified error, defaulting to retry")
}
