pub mod context_cache;
pub mod entry;
pub mod janitor;
pub mod metrics;
pub mod response_cache;
pub mod result_cache;

pub use context_cache::{BusinessContextCache, ContextKey};
pub use entry::{CacheEntry, Lookup};
pub use janitor::CacheJanitor;
pub use metrics::{CacheMetrics, CacheStats};
pub use response_cache::{CachedResponse, ResponseCache, ResponseKey};
pub use result_cache::{ResultCache, ResultKey};

use readiness_core::{Clock, SystemClock};
use std::sync::Arc;

/// The three caches plus the counters and clock they share.
pub struct CacheService {
    pub responses: ResponseCache,
    pub contexts: BusinessContextCache,
    pub results: ResultCache,
    metrics: Arc<CacheMetrics>,
    clock: Arc<dyn Clock>,
}

impl CacheService {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let metrics = Arc::new(CacheMetrics::new());
        Self {
            responses: ResponseCache::new(metrics.clone(), clock.clone()),
            contexts: BusinessContextCache::new(metrics.clone(), clock.clone()),
            results: ResultCache::new(metrics.clone(), clock.clone()),
            metrics,
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        &self.metrics
    }

    pub fn hit_rate(&self, project_id: &str) -> f64 {
        self.metrics.hit_rate(project_id)
    }

    /// Live Result + Context entries for the project.
    pub fn cache_size(&self, project_id: &str) -> u64 {
        self.metrics.size(project_id)
    }

    pub fn cache_hits(&self, project_id: &str) -> u64 {
        self.metrics.stats(project_id).hits
    }

    pub fn cache_misses(&self, project_id: &str) -> u64 {
        self.metrics.stats(project_id).misses
    }

    /// Sweep all three caches; returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        self.responses.purge_expired() + self.contexts.purge_expired() + self.results.purge_expired()
    }
}

impl Default for CacheService {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}
