//! The `Agent` capability contract and the request/metadata shapes around it.

use async_trait::async_trait;
use context::RequiredContext;
use schemas::{AgentId, AgentOutput, AuthContext, Task};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub input_types: Vec<String>,
    pub output_types: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AgentMetadata {
    pub id: AgentId,
    pub name: String,
    pub capabilities: Vec<Capability>,
    pub required_context: Vec<RequiredContext>,
    pub output_schema_id: String,
}

/// The context an agent is handed alongside its task, already curated and
/// merged with tenant/auth/previous-output bookkeeping.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub curated: context::CuratedContext,
    pub tenant_id: String,
    pub previous_outputs: Vec<AgentOutput>,
    pub constraints: serde_json::Value,
    pub auth: AuthContext,
}

#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub execution_id: Uuid,
    pub task: Task,
    pub context: RequestContext,
}

/// A value of polymorphic type implementing the engine's execution
/// capability. Concrete agents (planner, tester, reviewer, ...) implement
/// this; their internal business logic is out of scope here.
#[async_trait]
pub trait Agent: Send + Sync {
    fn metadata(&self) -> AgentMetadata;
    async fn execute(&self, request: AgentRequest) -> AgentOutput;
}
