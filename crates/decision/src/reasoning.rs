//! LLM reasoning fallback for when the rule table finds no match.

use crate::context::{DecisionAction, DecisionContext, RoutingDecision};
use llm::{Message, Provider, Request, Role};
use schemas::AgentId;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are the routing reasoner for an AI agent orchestration engine. \
Available agents: orchestrator, planner, architect, ui_designer, frontend_dev, backend_dev, \
tester, bug_fixer, reviewer, compliance. Given the task state, respond with a single JSON object \
of shape {\"next_agent\": string, \"reason\": string, \"priority\": number, \"alternative_agents\": [string]}.";

fn sanitize_payload(ctx: &DecisionContext) -> serde_json::Value {
    serde_json::json!({
        "phase": ctx.phase,
        "has_failures": ctx.has_failures,
        "failure_count": ctx.failure_count,
        "needs_approval": ctx.needs_approval,
        "completed_agents": ctx.completed_agents,
        "classification": ctx.classification(),
    })
}

fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn parse_agent_id(name: &str) -> Option<AgentId> {
    serde_json::from_value(serde_json::Value::String(name.to_string())).ok()
}

fn fallback_decision() -> RoutingDecision {
    let mut decision = RoutingDecision::new(
        DecisionAction::Route(AgentId::Planner),
        "fallback",
        50,
    );
    decision.reason = "fallback".to_string();
    decision
}

/// Strips tenant identifiers from the decision context before it is
/// embedded in a provider prompt, then tolerantly parses the response
/// (fenced code blocks included) against the `RoutingDecision` shape.
pub async fn reason(provider: Arc<dyn Provider>, ctx: &DecisionContext) -> RoutingDecision {
    let payload = sanitize_payload(ctx);
    let request = Request::new(
        SYSTEM_PROMPT,
        vec![Message {
            role: Role::User,
            content: payload.to_string(),
        }],
    );
    if request.validate().is_err() {
        return fallback_decision();
    }

    let response = match provider.complete(request).await {
        Ok(response) => response,
        Err(_) => return fallback_decision(),
    };

    let Some(parsed) = extract_json_object(&response.content) else {
        return fallback_decision();
    };

    let next_agent = parsed
        .get("next_agent")
        .and_then(|v| v.as_str())
        .and_then(parse_agent_id);
    let Some(next_agent) = next_agent else {
        return fallback_decision();
    };

    let reason = parsed
        .get("reason")
        .and_then(|v| v.as_str())
        .unwrap_or("reasoning step")
        .to_string();
    let priority = parsed
        .get("priority")
        .and_then(|v| v.as_u64())
        .map(|p| p.min(100) as u8)
        .unwrap_or(50);
    let alternative_agents = parsed
        .get("alternative_agents")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .filter_map(parse_agent_id)
                .collect()
        })
        .unwrap_or_default();

    RoutingDecision {
        action: DecisionAction::Route(next_agent),
        reason,
        priority,
        context_requirements: Vec::new(),
        alternative_agents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_object_handles_fenced_code_blocks() {
        let text = "```json\n{\"next_agent\": \"tester\", \"priority\": 40}\n```";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["next_agent"], "tester");
    }

    #[test]
    fn extract_json_object_returns_none_without_braces() {
        assert!(extract_json_object("no json here").is_none());
    }

    #[test]
    fn fallback_decision_routes_to_planner_at_priority_fifty() {
        let decision = fallback_decision();
        assert_eq!(decision.action, DecisionAction::Route(AgentId::Planner));
        assert_eq!(decision.priority, 50);
        assert_eq!(decision.reason, "fallback");
    }
}
