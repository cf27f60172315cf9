use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::CacheService;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Background sweeper that removes expired entries on a fixed interval.
///
/// Reads already expire entries lazily; the janitor only bounds memory for
/// keys that are never read again.
pub struct CacheJanitor {
    cache: Arc<CacheService>,
    interval: Duration,
}

impl CacheJanitor {
    /// `interval` is raised to at least one second; a zero period never ticks.
    pub fn new(cache: Arc<CacheService>, interval: Duration) -> Self {
        Self {
            cache,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn sweep_once(&self) -> usize {
        let removed = self.cache.purge_expired();
        if removed > 0 {
            debug!(removed, "Cache janitor purged expired entries");
        }
        removed
    }

    /// Run until `shutdown` is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // first tick fires immediately
            ticker.tick().await;
            info!(interval_secs = self.interval.as_secs(), "Cache janitor started");
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        self.sweep_once();
                    }
                }
            }
            info!("Cache janitor stopped");
        })
    }
}
