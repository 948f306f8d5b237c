//! `ContextManager`: curates a per-agent context window under a token budget.

use crate::budget::BudgetConfig;
use crate::cache::{CacheKey, ContextCache};
use crate::source::{ContextItem, ContextSource, ContextType, SourceParams};
use parking_lot::RwLock;
use schemas::{AuthContext, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// One entry in an agent's declared context requirements.
#[derive(Debug, Clone)]
pub struct RequiredContext {
    pub context_type: ContextType,
    pub required: bool,
    pub max_items: Option<u32>,
    pub filter: Option<serde_json::Value>,
}

impl RequiredContext {
    pub fn required(context_type: impl Into<ContextType>) -> Self {
        Self {
            context_type: context_type.into(),
            required: true,
            max_items: None,
            filter: None,
        }
    }

    pub fn optional(context_type: impl Into<ContextType>) -> Self {
        Self {
            context_type: context_type.into(),
            required: false,
            max_items: None,
            filter: None,
        }
    }

    pub fn with_max_items(mut self, max_items: u32) -> Self {
        self.max_items = Some(max_items);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct CuratedContext {
    pub items: HashMap<ContextType, Vec<ContextItem>>,
    pub missing_required: Vec<ContextType>,
    pub truncated_types: Vec<ContextType>,
    pub total_tokens_used: usize,
}

pub struct ContextManager {
    budget: BudgetConfig,
    cache: ContextCache,
    sources: RwLock<HashMap<ContextType, Arc<dyn ContextSource>>>,
}

impl ContextManager {
    pub fn new(budget: BudgetConfig) -> Self {
        Self {
            budget,
            cache: ContextCache::new(),
            sources: RwLock::new(HashMap::new()),
        }
    }

    /// Last registration for a given type wins; overwriting an existing
    /// source is logged as a warning rather than rejected.
    pub fn register_source(&self, source: Arc<dyn ContextSource>) {
        let context_type = source.context_type();
        let mut sources = self.sources.write();
        if sources.insert(context_type.clone(), source).is_some() {
            tracing::warn!(%context_type, "overwriting previously registered context source");
        }
    }

    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    fn priority_index(&self, context_type: &ContextType) -> usize {
        self.budget
            .priority_order
            .iter()
            .position(|t| t == context_type)
            .unwrap_or(usize::MAX)
    }

    /// Required context types are attempted before optional ones regardless
    /// of budget pressure; within each group, priority order is honored.
    pub async fn curate_context(
        &self,
        required: &[RequiredContext],
        auth: &AuthContext,
        project_id: &str,
        task_query: Option<&str>,
    ) -> Result<CuratedContext> {
        let mut ordered: Vec<&RequiredContext> = required.iter().collect();
        ordered.sort_by_key(|r| (!r.required, self.priority_index(&r.context_type)));

        let mut result = CuratedContext::default();
        let mut remaining_total = self.budget.total_tokens;
        let query = task_query.unwrap_or_default();

        for req in ordered {
            if remaining_total == 0 {
                break;
            }

            let Some(source) = self.sources.read().get(&req.context_type).cloned() else {
                if req.required {
                    result.missing_required.push(req.context_type.clone());
                }
                continue;
            };

            let cache_key = CacheKey::new(&auth.tenant_id, project_id, &req.context_type, query);
            let items = match self.cache.get(&cache_key) {
                Some(cached) => cached,
                None => {
                    let params = SourceParams {
                        tenant_id: auth.tenant_id.clone(),
                        project_id: project_id.to_string(),
                        query: query.to_string(),
                        max_items: req.max_items.unwrap_or(20),
                        filter: req.filter.clone(),
                        score_threshold: None,
                    };
                    params.validate()?;
                    match source.fetch(&params).await {
                        Ok(fetched) => {
                            self.cache.put(cache_key, fetched.clone());
                            fetched
                        }
                        Err(e) => {
                            tracing::warn!(context_type = %req.context_type, error = %e, "context source fetch failed");
                            Vec::new()
                        }
                    }
                }
            };

            let per_type_cap = self.budget.cap_for(&req.context_type);
            let type_cap = remaining_total.min(per_type_cap);
            let mut type_tokens = 0usize;
            let mut added = Vec::new();
            let mut truncated = false;
            for item in items {
                let cost = item.estimated_tokens();
                if type_tokens + cost > type_cap {
                    truncated = true;
                    break;
                }
                type_tokens += cost;
                added.push(item);
            }

            if truncated {
                result.truncated_types.push(req.context_type.clone());
            }
            if added.is_empty() && req.required {
                result.missing_required.push(req.context_type.clone());
            }

            remaining_total = remaining_total.saturating_sub(type_tokens);
            result.total_tokens_used += type_tokens;
            result.items.insert(req.context_type.clone(), added);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedSource {
        context_type: ContextType,
        items: Vec<ContextItem>,
    }

    #[async_trait]
    impl ContextSource for FixedSource {
        fn context_type(&self) -> ContextType {
            self.context_type.clone()
        }

        async fn fetch(&self, _params: &SourceParams) -> Result<Vec<ContextItem>> {
            Ok(self.items.clone())
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    fn item(id: &str, bytes: usize) -> ContextItem {
        ContextItem {
            id: id.to_string(),
            content: serde_json::Value::String("x".repeat(bytes)),
            score: None,
        }
    }

    fn auth() -> AuthContext {
        AuthContext::new("tenant-1", "user-1", "session-1")
    }

    #[tokio::test]
    async fn missing_source_marks_required_type_missing() {
        let manager = ContextManager::new(BudgetConfig::new());
        let required = vec![RequiredContext::required(ContextType::from(
            ContextType::CURRENT_TASK,
        ))];
        let curated = manager
            .curate_context(&required, &auth(), "proj-1", None)
            .await
            .unwrap();
        assert_eq!(
            curated.missing_required,
            vec![ContextType::from(ContextType::CURRENT_TASK)]
        );
    }

    #[tokio::test]
    async fn items_are_added_until_per_type_cap_is_hit() {
        let manager = ContextManager::new(
            BudgetConfig::new().with_per_type_cap(ContextType::from("source_code"), 10),
        );
        manager.register_source(Arc::new(FixedSource {
            context_type: ContextType::from("source_code"),
            items: vec![item("a", 20), item("b", 20), item("c", 20)],
        }));

        let required = vec![RequiredContext::required(ContextType::from("source_code"))];
        let curated = manager
            .curate_context(&required, &auth(), "proj-1", None)
            .await
            .unwrap();

        assert!(curated.truncated_types.contains(&ContextType::from("source_code")));
        assert!(curated.missing_required.is_empty());
        let added = &curated.items[&ContextType::from("source_code")];
        assert!(added.len() < 3);
    }

    #[tokio::test]
    async fn required_types_are_attempted_before_optional() {
        let manager = ContextManager::new(BudgetConfig::new().with_total_tokens(1));
        manager.register_source(Arc::new(FixedSource {
            context_type: ContextType::from("lessons_learned"),
            items: vec![item("lesson", 4)],
        }));
        manager.register_source(Arc::new(FixedSource {
            context_type: ContextType::from("current_task"),
            items: vec![item("task", 4)],
        }));

        let required = vec![
            RequiredContext::optional(ContextType::from("lessons_learned")),
            RequiredContext::required(ContextType::from("current_task")),
        ];
        let curated = manager
            .curate_context(&required, &auth(), "proj-1", None)
            .await
            .unwrap();

        assert!(curated.items.contains_key(&ContextType::from("current_task")));
        assert!(!curated.items.contains_key(&ContextType::from("lessons_learned")));
    }

    #[tokio::test]
    async fn register_source_overwrite_keeps_latest() {
        let manager = ContextManager::new(BudgetConfig::new());
        manager.register_source(Arc::new(FixedSource {
            context_type: ContextType::from("source_code"),
            items: vec![item("old", 4)],
        }));
        manager.register_source(Arc::new(FixedSource {
            context_type: ContextType::from("source_code"),
            items: vec![item("new", 4)],
        }));

        let required = vec![RequiredContext::required(ContextType::from("source_code"))];
        let curated = manager
            .curate_context(&required, &auth(), "proj-1", None)
            .await
            .unwrap();
        assert_eq!(curated.items[&ContextType::from("source_code")][0].id, "new");
    }
}
