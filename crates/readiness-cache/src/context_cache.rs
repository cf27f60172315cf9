use readiness_core::{BusinessContext, Clock, LLMConfig};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::entry::{CacheEntry, Lookup, TtlStore};
use crate::metrics::CacheMetrics;

/// `(project, codebase hash)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey {
    pub project_id: String,
    pub codebase_hash: String,
}

impl ContextKey {
    pub fn new(project_id: &str, codebase_hash: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            codebase_hash: codebase_hash.to_string(),
        }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "business:{}:{}", self.project_id, self.codebase_hash)
    }
}

/// Business rules and journeys extracted for one codebase snapshot.
pub struct BusinessContextCache {
    store: TtlStore<ContextKey, BusinessContext>,
    metrics: Arc<CacheMetrics>,
    clock: Arc<dyn Clock>,
}

impl BusinessContextCache {
    pub fn new(metrics: Arc<CacheMetrics>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: TtlStore::new(),
            metrics,
            clock,
        }
    }

    pub fn get(&self, key: &ContextKey, config: &LLMConfig) -> Option<BusinessContext> {
        if !config.use_cache() {
            self.metrics.record_miss(&key.project_id);
            return None;
        }

        match self.store.get(key, self.clock.now()) {
            Lookup::Hit(context) => {
                self.metrics.record_hit(&key.project_id);
                Some(context)
            }
            Lookup::Expired => {
                debug!(key = %key, "Business context entry expired");
                self.metrics.decrement_size(&key.project_id);
                self.metrics.record_miss(&key.project_id);
                None
            }
            Lookup::Miss => {
                self.metrics.record_miss(&key.project_id);
                None
            }
        }
    }

    pub fn set(&self, key: ContextKey, context: BusinessContext, config: &LLMConfig) {
        if !config.use_cache() {
            return;
        }
        let project_id = key.project_id.clone();
        let entry = CacheEntry::new(context, self.clock.now(), config.cache_ttl());
        if self.store.insert(key, entry) {
            self.metrics.increment_size(&project_id);
        }
    }

    pub fn purge_expired(&self) -> usize {
        let removed = self.store.purge_expired(self.clock.now());
        for key in &removed {
            self.metrics.decrement_size(&key.project_id);
        }
        removed.len()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
