//! Process-wide agent registry: register while open, look up once sealed.

use crate::agent::{Agent, AgentMetadata};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use schemas::{AgentId, EngineError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type AgentFactory = Box<dyn Fn() -> Arc<dyn Agent> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninstantiated,
    Ready,
}

#[derive(Debug, Clone)]
pub struct AgentStatus {
    pub state: LifecycleState,
    pub last_execution: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self {
            state: LifecycleState::Uninstantiated,
            last_execution: None,
            consecutive_failures: 0,
        }
    }
}

struct Entry {
    factory: AgentFactory,
    instance: RwLock<Option<Arc<dyn Agent>>>,
    metadata: AgentMetadata,
    status: RwLock<AgentStatus>,
}

/// Thread-safe registry with a constructible -> sealed lifecycle. Once
/// sealed, registration is rejected but lookups continue to work from many
/// readers without further locking beyond the per-entry instance cell.
pub struct AgentRegistry {
    entries: RwLock<HashMap<AgentId, Entry>>,
    sealed: AtomicBool,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            sealed: AtomicBool::new(false),
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    pub fn register<F>(&self, metadata: AgentMetadata, factory: F) -> Result<()>
    where
        F: Fn() -> Arc<dyn Agent> + Send + Sync + 'static,
    {
        if self.is_sealed() {
            return Err(EngineError::InvariantViolation(
                "agent registry is sealed".to_string(),
            ));
        }
        let mut entries = self.entries.write();
        if entries.contains_key(&metadata.id) {
            return Err(EngineError::Conflict(format!(
                "agent {} already registered",
                metadata.id
            )));
        }
        entries.insert(
            metadata.id,
            Entry {
                factory: Box::new(factory),
                instance: RwLock::new(None),
                metadata,
                status: RwLock::new(AgentStatus::default()),
            },
        );
        Ok(())
    }

    pub fn metadata(&self, id: AgentId) -> Result<AgentMetadata> {
        let entries = self.entries.read();
        entries
            .get(&id)
            .map(|e| e.metadata.clone())
            .ok_or_else(|| EngineError::NotFound(format!("agent not found: {id}")))
    }

    /// Instantiates the concrete agent on first call; subsequent calls reuse
    /// the cached instance.
    pub fn get_agent(&self, id: AgentId) -> Result<Arc<dyn Agent>> {
        let entries = self.entries.read();
        let entry = entries
            .get(&id)
            .ok_or_else(|| EngineError::NotFound(format!("agent not found: {id}")))?;

        if let Some(existing) = entry.instance.read().clone() {
            return Ok(existing);
        }
        let mut slot = entry.instance.write();
        if let Some(existing) = slot.clone() {
            return Ok(existing);
        }
        let instance = (entry.factory)();
        *slot = Some(instance.clone());
        entry.status.write().state = LifecycleState::Ready;
        Ok(instance)
    }

    pub fn status(&self, id: AgentId) -> Result<AgentStatus> {
        let entries = self.entries.read();
        entries
            .get(&id)
            .map(|e| e.status.read().clone())
            .ok_or_else(|| EngineError::NotFound(format!("agent not found: {id}")))
    }

    pub fn record_execution(&self, id: AgentId, success: bool) {
        let entries = self.entries.read();
        if let Some(entry) = entries.get(&id) {
            let mut status = entry.status.write();
            status.last_execution = Some(Utc::now());
            status.consecutive_failures = if success {
                0
            } else {
                status.consecutive_failures + 1
            };
        }
    }

    pub fn find_by_capability(&self, name: &str) -> Vec<AgentId> {
        self.entries
            .read()
            .values()
            .filter(|e| e.metadata.capabilities.iter().any(|c| c.name == name))
            .map(|e| e.metadata.id)
            .collect()
    }

    pub fn find_by_input_type(&self, input_type: &str) -> Vec<AgentId> {
        self.entries
            .read()
            .values()
            .filter(|e| {
                e.metadata
                    .capabilities
                    .iter()
                    .any(|c| c.input_types.iter().any(|t| t == input_type))
            })
            .map(|e| e.metadata.id)
            .collect()
    }

    pub fn find_by_output_type(&self, output_type: &str) -> Vec<AgentId> {
        self.entries
            .read()
            .values()
            .filter(|e| {
                e.metadata
                    .capabilities
                    .iter()
                    .any(|c| c.output_types.iter().any(|t| t == output_type))
            })
            .map(|e| e.metadata.id)
            .collect()
    }

    pub fn registered_ids(&self) -> Vec<AgentId> {
        self.entries.read().keys().copied().collect()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentRequest, Capability};
    use async_trait::async_trait;
    use schemas::AgentOutput;

    struct Stub;

    #[async_trait]
    impl Agent for Stub {
        fn metadata(&self) -> AgentMetadata {
            AgentMetadata {
                id: AgentId::Planner,
                name: "planner".to_string(),
                capabilities: vec![Capability {
                    name: "plan".to_string(),
                    input_types: vec!["prompt".to_string()],
                    output_types: vec!["work_breakdown".to_string()],
                }],
                required_context: vec![],
                output_schema_id: "work_breakdown.v1".to_string(),
            }
        }

        async fn execute(&self, _request: AgentRequest) -> AgentOutput {
            AgentOutput::success(AgentId::Planner, serde_json::json!({}))
        }
    }

    fn metadata() -> AgentMetadata {
        AgentMetadata {
            id: AgentId::Planner,
            name: "planner".to_string(),
            capabilities: vec![Capability {
                name: "plan".to_string(),
                input_types: vec!["prompt".to_string()],
                output_types: vec!["work_breakdown".to_string()],
            }],
            required_context: vec![],
            output_schema_id: "work_breakdown.v1".to_string(),
        }
    }

    #[test]
    fn register_then_get_agent_lazily_instantiates() {
        let registry = AgentRegistry::new();
        registry.register(metadata(), || Arc::new(Stub)).unwrap();
        assert_eq!(
            registry.status(AgentId::Planner).unwrap().state,
            LifecycleState::Uninstantiated
        );
        registry.get_agent(AgentId::Planner).unwrap();
        assert_eq!(
            registry.status(AgentId::Planner).unwrap().state,
            LifecycleState::Ready
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = AgentRegistry::new();
        registry.register(metadata(), || Arc::new(Stub)).unwrap();
        assert!(registry.register(metadata(), || Arc::new(Stub)).is_err());
    }

    #[test]
    fn registration_after_seal_is_rejected() {
        let registry = AgentRegistry::new();
        registry.seal();
        assert!(registry.register(metadata(), || Arc::new(Stub)).is_err());
    }

    #[test]
    fn unknown_agent_lookup_fails() {
        let registry = AgentRegistry::new();
        assert!(registry.get_agent(AgentId::Tester).is_err());
    }

    #[test]
    fn find_by_capability_matches_registered_agents() {
        let registry = AgentRegistry::new();
        registry.register(metadata(), || Arc::new(Stub)).unwrap();
        assert_eq!(registry.find_by_capability("plan"), vec![AgentId::Planner]);
        assert!(registry.find_by_capability("nonexistent").is_empty());
    }

    #[test]
    fn record_execution_tracks_consecutive_failures() {
        let registry = AgentRegistry::new();
        registry.register(metadata(), || Arc::new(Stub)).unwrap();
        registry.record_execution(AgentId::Planner, false);
        registry.record_execution(AgentId::Planner, false);
        assert_eq!(registry.status(AgentId::Planner).unwrap().consecutive_failures, 2);
        registry.record_execution(AgentId::Planner, true);
        assert_eq!(registry.status(AgentId::Planner).unwrap().consecutive_failures, 0);
    }
}
