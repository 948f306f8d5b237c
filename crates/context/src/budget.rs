//! The token budget context curation is evaluated against.

use crate::source::ContextType;
use std::collections::HashMap;

pub const DEFAULT_TOTAL_TOKENS: usize = 8_000;
pub const DEFAULT_PER_TYPE_TOKENS: usize = 2_000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct BudgetConfig {
    pub total_tokens: usize,
    pub per_type_tokens: HashMap<ContextType, usize>,
    /// `current_task` first, then the rest in the order an agent declares
    /// them — required types are always attempted ahead of optional ones
    /// regardless of this order.
    pub priority_order: Vec<ContextType>,
}

impl BudgetConfig {
    pub fn new() -> Self {
        Self {
            total_tokens: DEFAULT_TOTAL_TOKENS,
            per_type_tokens: HashMap::new(),
            priority_order: vec![
                ContextType::from(ContextType::CURRENT_TASK),
                ContextType::from(ContextType::PROJECT_CONFIG),
                ContextType::from(ContextType::SOURCE_CODE),
                ContextType::from(ContextType::LESSONS_LEARNED),
                ContextType::from(ContextType::AGENT_OUTPUTS),
            ],
        }
    }

    pub fn with_total_tokens(mut self, total_tokens: usize) -> Self {
        self.total_tokens = total_tokens;
        self
    }

    pub fn with_per_type_cap(mut self, context_type: ContextType, cap: usize) -> Self {
        self.per_type_tokens.insert(context_type, cap);
        self
    }

    pub fn with_priority_order(mut self, order: Vec<ContextType>) -> Self {
        self.priority_order = order;
        self
    }

    pub fn cap_for(&self, context_type: &ContextType) -> usize {
        self.per_type_tokens
            .get(context_type)
            .copied()
            .unwrap_or(DEFAULT_PER_TYPE_TOKENS)
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self::new()
    }
}
