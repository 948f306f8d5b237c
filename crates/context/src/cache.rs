//! Curated-item cache keyed by `(tenant, project, type, query prefix)`.

use crate::budget::DEFAULT_CACHE_TTL_SECS;
use crate::source::{ContextItem, ContextType};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    tenant_id: String,
    project_id: String,
    context_type: ContextType,
    query_prefix: String,
}

impl CacheKey {
    pub fn new(tenant_id: &str, project_id: &str, context_type: &ContextType, query: &str) -> Self {
        let prefix_len = query.char_indices().nth(50).map(|(i, _)| i).unwrap_or(query.len());
        Self {
            tenant_id: tenant_id.to_string(),
            project_id: project_id.to_string(),
            context_type: context_type.clone(),
            query_prefix: query[..prefix_len].to_string(),
        }
    }
}

struct CacheEntry {
    items: Vec<ContextItem>,
    inserted_at: Instant,
}

pub struct ContextCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl ContextCache {
    pub fn new() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns cached items if present and not yet expired. An expired
    /// entry is dropped on this read rather than by a background sweep.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<ContextItem>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.items.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: CacheKey, items: Vec<ContextItem>) {
        self.entries.lock().insert(
            key,
            CacheEntry {
                items,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn invalidate_all(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ContextCache {
    fn default() -> Self {
        Self::new()
    }
}
