mod budget;
mod cache;
mod manager;
mod source;

pub use budget::{BudgetConfig, DEFAULT_CACHE_TTL_SECS, DEFAULT_PER_TYPE_TOKENS, DEFAULT_TOTAL_TOKENS};
pub use manager::{ContextManager, CuratedContext, RequiredContext};
pub use source::{ContextItem, ContextSource, ContextType, SourceParams};
