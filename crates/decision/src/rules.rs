//! The deterministic rule table, evaluated before any LLM reasoning step.

use crate::context::{DecisionAction, DecisionContext};
use schemas::{AgentId, Phase};

pub struct Rule {
    pub id: &'static str,
    pub priority: u8,
    pub condition: fn(&DecisionContext) -> bool,
    pub action: DecisionAction,
    pub description: &'static str,
}

/// Must be reproduced exactly, priorities included: callers sort ascending
/// and take the first match.
pub fn seed_table() -> Vec<Rule> {
    vec![
        Rule {
            id: "security-concern",
            priority: 0,
            condition: |ctx| ctx.security_concern,
            action: DecisionAction::Route(AgentId::Compliance),
            description: "security concern flagged on the task",
        },
        Rule {
            id: "max-failures-abort",
            priority: 5,
            condition: |ctx| ctx.failure_count >= 5,
            action: DecisionAction::Abort,
            description: "failure count reached the abort threshold",
        },
        Rule {
            id: "max-failures-escalate",
            priority: 10,
            condition: |ctx| ctx.failure_count >= 3,
            action: DecisionAction::Escalate,
            description: "failure count reached the escalation threshold",
        },
        Rule {
            id: "test-failure",
            priority: 15,
            condition: |ctx| ctx.has_failures && ctx.failure_count < 3,
            action: DecisionAction::Route(AgentId::BugFixer),
            description: "recoverable test failure",
        },
        Rule {
            id: "needs-approval",
            priority: 25,
            condition: |ctx| ctx.needs_approval,
            action: DecisionAction::Pause,
            description: "an agent output requires user approval",
        },
        Rule {
            id: "needs-architecture",
            priority: 35,
            condition: |ctx| {
                ctx.classification().requires_architecture && !ctx.has_completed(AgentId::Architect)
            },
            action: DecisionAction::Route(AgentId::Architect),
            description: "classification requires an architecture pass",
        },
        Rule {
            id: "needs-design",
            priority: 36,
            condition: |ctx| {
                ctx.classification().requires_design && !ctx.has_completed(AgentId::UiDesigner)
            },
            action: DecisionAction::Route(AgentId::UiDesigner),
            description: "classification requires a design pass",
        },
        Rule {
            id: "needs-compliance",
            priority: 37,
            condition: |ctx| {
                ctx.classification().requires_compliance && !ctx.has_completed(AgentId::Compliance)
            },
            action: DecisionAction::Route(AgentId::Compliance),
            description: "classification requires a compliance pass",
        },
        Rule {
            id: "ready-for-frontend",
            priority: 45,
            condition: |ctx| {
                ctx.phase == Phase::Building
                    && ctx.has_completed(AgentId::UiDesigner)
                    && !ctx.has_completed(AgentId::FrontendDev)
            },
            action: DecisionAction::Route(AgentId::FrontendDev),
            description: "design complete, frontend work pending",
        },
        Rule {
            id: "ready-for-backend",
            priority: 46,
            condition: |ctx| ctx.phase == Phase::Building && !ctx.has_completed(AgentId::BackendDev),
            action: DecisionAction::Route(AgentId::BackendDev),
            description: "backend work pending during build phase",
        },
        Rule {
            id: "ready-for-testing",
            priority: 55,
            condition: |ctx| {
                ctx.phase == Phase::Testing
                    && (ctx.has_completed(AgentId::FrontendDev) || ctx.has_completed(AgentId::BackendDev))
                    && !ctx.has_completed(AgentId::Tester)
            },
            action: DecisionAction::Route(AgentId::Tester),
            description: "implementation complete, testing pending",
        },
        Rule {
            id: "ready-for-review",
            priority: 65,
            condition: |ctx| {
                ctx.phase == Phase::Reviewing
                    && ctx.has_completed(AgentId::Tester)
                    && !ctx.has_completed(AgentId::Reviewer)
            },
            action: DecisionAction::Route(AgentId::Reviewer),
            description: "tests complete, review pending",
        },
        Rule {
            id: "all-complete",
            priority: 90,
            condition: |ctx| ctx.has_completed(AgentId::Reviewer) && !ctx.has_failures,
            action: DecisionAction::Complete,
            description: "review complete with no outstanding failures",
        },
    ]
}

fn rule_table() -> &'static [Rule] {
    static TABLE: OnceLock<Vec<Rule>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = seed_table();
        table.sort_by_key(|r| r.priority);
        table
    })
}

/// Evaluates the table in ascending-priority order; returns the first
/// matching rule, if any.
pub fn evaluate(ctx: &DecisionContext) -> Option<&'static Rule> {
    rule_table().iter().find(|rule| (rule.condition)(ctx))
}

use std::sync::OnceLock;
