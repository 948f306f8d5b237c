//! The pluggable producer interface context registers against.

use async_trait::async_trait;
use schemas::Result;
use serde::{Deserialize, Serialize};

/// Left open-ended as a string wrapper — new context types (e.g. a RAG
/// retriever's category) are additive, not a schema change.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextType(pub String);

impl ContextType {
    pub const CURRENT_TASK: &'static str = "current_task";
    pub const PROJECT_CONFIG: &'static str = "project_config";
    pub const SOURCE_CODE: &'static str = "source_code";
    pub const LESSONS_LEARNED: &'static str = "lessons_learned";
    pub const AGENT_OUTPUTS: &'static str = "agent_outputs";
}

impl From<&str> for ContextType {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for ContextType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single retrieved piece of context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextItem {
    pub id: String,
    pub content: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl ContextItem {
    /// `ceil(utf8_bytes_of_content_serialized_as_compact_json / 4)`.
    pub fn estimated_tokens(&self) -> usize {
        let serialized = serde_json::to_vec(&self.content).unwrap_or_default();
        serialized.len().div_ceil(4)
    }
}

#[derive(Debug, Clone)]
pub struct SourceParams {
    pub tenant_id: String,
    pub project_id: String,
    pub query: String,
    pub max_items: u32,
    pub filter: Option<serde_json::Value>,
    pub score_threshold: Option<f32>,
}

impl SourceParams {
    pub fn validate(&self) -> Result<()> {
        use schemas::EngineError;
        if self.query.chars().count() > 10_000 {
            return Err(EngineError::ValidationFailure(
                "context query exceeds 10000 characters".to_string(),
            ));
        }
        if !(1..=100).contains(&self.max_items) {
            return Err(EngineError::ValidationFailure(
                "context max_items out of range [1,100]".to_string(),
            ));
        }
        if let Some(threshold) = self.score_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(EngineError::ValidationFailure(
                    "context score_threshold out of range [0,1]".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// A pluggable producer of context items for one `ContextType`.
///
/// Implementations wrap vector stores, git history readers, or any other
/// backing store; this crate only specifies the interface the engine
/// consumes — concrete sources (e.g. RAG retrieval) are out of scope.
#[async_trait]
pub trait ContextSource: Send + Sync {
    fn context_type(&self) -> ContextType;
    async fn fetch(&self, params: &SourceParams) -> Result<Vec<ContextItem>>;
    async fn is_available(&self) -> bool;
}
