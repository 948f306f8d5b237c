//! Resolves a chosen agent into an executable request, then runs it.

use crate::agent::{AgentRequest, RequestContext};
use crate::registry::AgentRegistry;
use context::ContextManager;
use schemas::{AgentId, AgentOutput, AuthContext, EngineError, Result, Task};
use std::sync::Arc;
use uuid::Uuid;

/// What the decision layer hands the router: which agent to invoke and the
/// prior execution state it needs to be aware of.
pub struct RouteInput<'a> {
    pub next_agent: AgentId,
    pub project_id: &'a str,
    pub task: &'a Task,
    pub auth: &'a AuthContext,
    pub previous_outputs: &'a [AgentOutput],
    pub constraints: serde_json::Value,
}

pub struct Router {
    registry: Arc<AgentRegistry>,
    context_manager: Arc<ContextManager>,
    default_constraints: serde_json::Value,
}

fn merge_constraints(defaults: &serde_json::Value, explicit: &serde_json::Value) -> serde_json::Value {
    let mut merged = defaults.clone();
    if let (Some(merged_obj), Some(explicit_obj)) = (merged.as_object_mut(), explicit.as_object()) {
        for (k, v) in explicit_obj {
            merged_obj.insert(k.clone(), v.clone());
        }
    } else if explicit.is_object() {
        return explicit.clone();
    }
    merged
}

impl Router {
    pub fn new(registry: Arc<AgentRegistry>, context_manager: Arc<ContextManager>) -> Self {
        Self {
            registry,
            context_manager,
            default_constraints: serde_json::json!({}),
        }
    }

    pub fn with_default_constraints(mut self, constraints: serde_json::Value) -> Self {
        self.default_constraints = constraints;
        self
    }

    pub async fn route(&self, input: RouteInput<'_>) -> Result<AgentRequest> {
        input.auth.validate()?;

        let metadata = self.registry.metadata(input.next_agent)?;

        let curated = self
            .context_manager
            .curate_context(
                &metadata.required_context,
                input.auth,
                input.project_id,
                Some(&input.task.prompt),
            )
            .await?;
        for missing in &curated.missing_required {
            tracing::warn!(
                agent = %input.next_agent,
                context_type = %missing,
                "required context missing for agent request"
            );
        }

        Ok(AgentRequest {
            execution_id: Uuid::new_v4(),
            task: input.task.clone(),
            context: RequestContext {
                curated,
                tenant_id: input.auth.tenant_id.clone(),
                previous_outputs: input.previous_outputs.to_vec(),
                constraints: merge_constraints(&self.default_constraints, &input.constraints),
                auth: input.auth.clone(),
            },
        })
    }

    pub async fn execute(&self, input: RouteInput<'_>) -> Result<AgentOutput> {
        let next_agent = input.next_agent;
        let tenant_id = input.auth.tenant_id.clone();
        let request = self.route(input).await?;
        let agent = self.registry.get_agent(next_agent)?;

        let output = agent.execute(request).await;
        if !output.artifacts_are_tenant_safe(&tenant_id) {
            self.registry.record_execution(next_agent, false);
            return Err(EngineError::SecurityViolation(
                "agent output references artifacts outside its tenant".to_string(),
            ));
        }
        self.registry.record_execution(next_agent, output.success);
        Ok(output)
    }

    /// Validates auth once, then routes and executes every request
    /// concurrently. All requests must share the tenant already validated.
    pub async fn execute_parallel(&self, inputs: Vec<RouteInput<'_>>) -> Result<Vec<Result<AgentOutput>>> {
        if let Some(first) = inputs.first() {
            first.auth.validate()?;
        }
        let futures = inputs.into_iter().map(|input| self.execute(input));
        Ok(futures::future::join_all(futures).await)
    }
}
