use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct ProjectCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    /// Live Result + Context entries
    size: AtomicU64,
}

/// Snapshot of one project's cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

/// Per-project hit/miss/size counters shared by every cache.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    projects: DashMap<String, Arc<ProjectCounters>>,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, project_id: &str) -> Arc<ProjectCounters> {
        if let Some(c) = self.projects.get(project_id) {
            return c.clone();
        }
        self.projects
            .entry(project_id.to_string())
            .or_default()
            .clone()
    }

    pub fn record_hit(&self, project_id: &str) {
        self.counters(project_id).hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self, project_id: &str) {
        self.counters(project_id).misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_size(&self, project_id: &str) {
        self.counters(project_id).size.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrement the live-entry counter, saturating at zero.
    pub fn decrement_size(&self, project_id: &str) {
        let _ = self.counters(project_id).size.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |n| n.checked_sub(1),
        );
    }

    pub fn stats(&self, project_id: &str) -> CacheStats {
        match self.projects.get(project_id) {
            Some(c) => CacheStats {
                hits: c.hits.load(Ordering::Relaxed),
                misses: c.misses.load(Ordering::Relaxed),
                size: c.size.load(Ordering::Acquire),
            },
            None => CacheStats::default(),
        }
    }

    /// `hits / (hits + misses)`, 0 when the project has no reads.
    pub fn hit_rate(&self, project_id: &str) -> f64 {
        self.stats(project_id).hit_rate()
    }

    pub fn size(&self, project_id: &str) -> u64 {
        self.stats(project_id).size
    }
}
