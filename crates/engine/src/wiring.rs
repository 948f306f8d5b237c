//! Assembles the seven in-scope subsystems into one `workflow::WorkflowEngine`.
//!
//! Construction order matters: the registry is built and sealed first (every
//! agent registers before the router can resolve any of them), then the
//! context manager, checkpoint store, activity stream and audit log are each
//! rooted under the session's base directory, and finally the optional LLM
//! provider is wired in for classification and decision-engine fallback.

use activity::{ActivityStream, ActivityStreamConfig};
use audit::AuditLog;
use checkpoint::{CheckpointStore, CheckpointStoreConfig};
use context::{BudgetConfig, ContextManager};
use llm::{HttpProvider, Provider, ProviderConfig};
use registry::{AgentRegistry, Router};
use schemas::{EngineError, Result};
use std::path::Path;
use std::sync::Arc;
use workflow::WorkflowEngine;

/// Where to find a provider API key, and which base URL/model to call it
/// with, if the caller wants LLM-backed classification and decision
/// fallback instead of the conservative/rule-only defaults.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key_env: String,
    pub base_url: String,
    pub model: String,
}

pub struct EngineBuilder {
    registry: Arc<AgentRegistry>,
    base_dir: std::path::PathBuf,
    budget: BudgetConfig,
    provider_settings: Option<ProviderSettings>,
}

impl EngineBuilder {
    pub fn new(registry: Arc<AgentRegistry>, base_dir: impl AsRef<Path>) -> Self {
        Self {
            registry,
            base_dir: base_dir.as_ref().to_path_buf(),
            budget: BudgetConfig::new(),
            provider_settings: None,
        }
    }

    pub fn with_budget(mut self, budget: BudgetConfig) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_provider(mut self, settings: ProviderSettings) -> Self {
        self.provider_settings = Some(settings);
        self
    }

    fn build_provider(&self) -> Result<Option<Arc<dyn Provider>>> {
        let Some(settings) = &self.provider_settings else {
            return Ok(None);
        };
        let config = ProviderConfig::from_env(
            &settings.api_key_env,
            settings.base_url.clone(),
            settings.model.clone(),
        )
        .map_err(|e| EngineError::ValidationFailure(format!("provider config: {e}")))?;
        let provider = HttpProvider::new(config)
            .map_err(|e| EngineError::ValidationFailure(format!("provider init: {e}")))?;
        Ok(Some(Arc::new(provider) as Arc<dyn Provider>))
    }

    pub fn build(self) -> Result<WorkflowEngine> {
        self.registry.seal();

        let context_manager = Arc::new(ContextManager::new(self.budget));
        let router = Router::new(self.registry.clone(), context_manager);

        let checkpoints = Arc::new(CheckpointStore::new(CheckpointStoreConfig::new(
            self.base_dir.join("checkpoints"),
        ))?);
        let activity = Arc::new(ActivityStream::new(ActivityStreamConfig::default()));
        let audit = Arc::new(AuditLog::with_persist_file(
            self.base_dir.join("audit").join("audit.jsonl"),
        )?);

        let provider = self.build_provider()?;

        Ok(WorkflowEngine::new(router, checkpoints, activity, audit, provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_an_engine_without_a_provider() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(AgentRegistry::new());
        let engine = EngineBuilder::new(registry, dir.path()).build();
        assert!(engine.is_ok());
    }

    #[test]
    fn missing_provider_api_key_surfaces_as_validation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(AgentRegistry::new());
        let engine = EngineBuilder::new(registry, dir.path())
            .with_provider(ProviderSettings {
                api_key_env: "ORCA_TEST_DOES_NOT_EXIST_KEY".to_string(),
                base_url: "https://example.invalid".to_string(),
                model: "test-model".to_string(),
            })
            .build();
        assert!(matches!(engine, Err(EngineError::ValidationFailure(_))));
    }
}
