use readiness_core::{sha256_hex, Clock, Depth, LLMConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::entry::{CacheEntry, Lookup, TtlStore};
use crate::metrics::CacheMetrics;

/// `(sha256(content), analysis type, depth tier)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    pub content_hash: String,
    pub analysis_type: String,
    pub depth: Depth,
}

impl ResponseKey {
    pub fn new(content: &str, analysis_type: &str, depth: Depth) -> Self {
        Self {
            content_hash: sha256_hex(content),
            analysis_type: analysis_type.to_string(),
            depth,
        }
    }
}

impl fmt::Display for ResponseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "llm:{}:{}:{}", self.content_hash, self.analysis_type, self.depth)
    }
}

/// Raw model output kept for reuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub text: String,
    pub tokens_used: u64,
    pub model: String,
}

/// Content-addressed cache of model responses. Tracks hits and misses but
/// not a live-entry count.
pub struct ResponseCache {
    store: TtlStore<ResponseKey, CachedResponse>,
    metrics: Arc<CacheMetrics>,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(metrics: Arc<CacheMetrics>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: TtlStore::new(),
            metrics,
            clock,
        }
    }

    pub fn get(
        &self,
        project_id: &str,
        key: &ResponseKey,
        config: &LLMConfig,
    ) -> Option<CachedResponse> {
        if !config.use_cache() {
            self.metrics.record_miss(project_id);
            return None;
        }

        match self.store.get(key, self.clock.now()) {
            Lookup::Hit(response) => {
                self.metrics.record_hit(project_id);
                Some(response)
            }
            Lookup::Expired => {
                debug!(key = %key, "Response cache entry expired");
                self.metrics.record_miss(project_id);
                None
            }
            Lookup::Miss => {
                self.metrics.record_miss(project_id);
                None
            }
        }
    }

    pub fn set(&self, key: ResponseKey, response: CachedResponse, config: &LLMConfig) {
        if !config.use_cache() {
            return;
        }
        let entry = CacheEntry::new(response, self.clock.now(), config.cache_ttl());
        self.store.insert(key, entry);
    }

    /// Drop expired entries; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired(self.clock.now()).len()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
