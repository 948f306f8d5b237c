//! `AgentOutput` and its nested shapes.

use crate::task::AgentId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Hints the router and decision engine use to pick the next step without
/// re-deriving them from the raw result payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingHints {
    #[serde(default)]
    pub suggested_next_agents: Vec<AgentId>,
    #[serde(default)]
    pub skip: Vec<AgentId>,
    #[serde(default)]
    pub needs_approval: bool,
    #[serde(default)]
    pub has_failures: bool,
    #[serde(default)]
    pub is_complete: bool,
}

/// Error codes the decision engine's failure analysis switches on. `code` is
/// left as a string rather than an enum: agents may introduce new codes the
/// engine treats as `GENERIC_ERROR` by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentError {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub recoverable: bool,
}

impl AgentError {
    pub const SECURITY_VIOLATION: &'static str = "SECURITY_VIOLATION";
    pub const TEST_FAILURE: &'static str = "TEST_FAILURE";
    pub const GENERIC_ERROR: &'static str = "GENERIC_ERROR";

    pub fn generic(message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            code: Self::GENERIC_ERROR.to_string(),
            message: message.into(),
            recoverable,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutput {
    pub agent: AgentId,
    pub success: bool,
    pub result: serde_json::Value,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub routing_hints: RoutingHints,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AgentError>,
    pub token_usage: TokenUsage,
    pub duration_ms: u64,
}

impl AgentOutput {
    pub fn success(agent: AgentId, result: serde_json::Value) -> Self {
        Self {
            agent,
            success: true,
            result,
            artifacts: Vec::new(),
            routing_hints: RoutingHints::default(),
            error: None,
            token_usage: TokenUsage::default(),
            duration_ms: 0,
        }
    }

    pub fn failure(agent: AgentId, error: AgentError) -> Self {
        Self {
            agent,
            success: false,
            result: serde_json::Value::Null,
            artifacts: Vec::new(),
            routing_hints: RoutingHints {
                has_failures: true,
                ..RoutingHints::default()
            },
            error: Some(error),
            token_usage: TokenUsage::default(),
            duration_ms: 0,
        }
    }

    /// Every artifact path either contains the tenant id or contains no
    /// tenant reference at all — never a different tenant's id.
    pub fn artifacts_are_tenant_safe(&self, tenant_id: &str) -> bool {
        self.artifacts.iter().all(|artifact| {
            artifact.path.contains(tenant_id) || !looks_like_tenant_path(&artifact.path)
        })
    }
}

fn looks_like_tenant_path(path: &str) -> bool {
    path.contains("/tenants/") || path.contains("tenant-")
}
