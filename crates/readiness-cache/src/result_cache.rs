use readiness_core::{AnalysisMode, AnalysisReport, Clock, Depth, LLMConfig};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::entry::{CacheEntry, Lookup, TtlStore};
use crate::metrics::CacheMetrics;

/// `(project, feature hash, depth, mode)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultKey {
    pub project_id: String,
    pub feature_hash: String,
    pub depth: Depth,
    pub mode: AnalysisMode,
}

impl ResultKey {
    pub fn new(project_id: &str, feature_hash: &str, depth: Depth, mode: AnalysisMode) -> Self {
        Self {
            project_id: project_id.to_string(),
            feature_hash: feature_hash.to_string(),
            depth,
            mode,
        }
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "analysis:{}:{}:{}:{}",
            self.project_id, self.feature_hash, self.depth, self.mode
        )
    }
}

/// Whole assembled reports, so a repeated request costs nothing.
pub struct ResultCache {
    store: TtlStore<ResultKey, AnalysisReport>,
    metrics: Arc<CacheMetrics>,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    pub fn new(metrics: Arc<CacheMetrics>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: TtlStore::new(),
            metrics,
            clock,
        }
    }

    pub fn get(&self, key: &ResultKey, config: &LLMConfig) -> Option<AnalysisReport> {
        if !config.use_cache() {
            self.metrics.record_miss(&key.project_id);
            return None;
        }

        match self.store.get(key, self.clock.now()) {
            Lookup::Hit(report) => {
                self.metrics.record_hit(&key.project_id);
                Some(report)
            }
            Lookup::Expired => {
                debug!(key = %key, "Result cache entry expired");
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

    pub fn set(&self, key: ResultKey, report: AnalysisReport, config: &LLMConfig) {
        if !config.use_cache() {
            return;
        }
        let project_id = key.project_id.clone();
        let entry = CacheEntry::new(report, self.clock.now(), config.cache_ttl());
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
