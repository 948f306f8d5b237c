mod context;
mod failure;
mod reasoning;
mod rules;

pub use context::{DecisionAction, DecisionContext, RoutingDecision};
pub use failure::{analyze as analyze_failure, FailureAnalysis, FailureStrategy};
pub use rules::{seed_table, Rule};

use llm::Provider;
use std::sync::Arc;

/// Two-layer routing policy: the deterministic rule table runs first, and
/// only when nothing matches does the engine fall back to an LLM reasoning
/// step.
pub struct DecisionEngine {
    provider: Option<Arc<dyn Provider>>,
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self { provider: None }
    }

    pub fn with_provider(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    pub async fn decide(&self, ctx: &DecisionContext) -> RoutingDecision {
        if let Some(rule) = rules::evaluate(ctx) {
            return RoutingDecision::new(rule.action, rule.description, rule.priority);
        }

        match &self.provider {
            Some(provider) => reasoning::reason(provider.clone(), ctx).await,
            None => RoutingDecision::new(
                DecisionAction::Route(schemas::AgentId::Planner),
                "fallback",
                50,
            ),
        }
    }

    pub fn analyze_failure(
        &self,
        output: &schemas::AgentOutput,
        failure_count: u32,
    ) -> FailureAnalysis {
        failure::analyze(output, failure_count)
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new()
    }
}
