//! Periodic wholesale cache invalidation.

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tracing::info;

use super::store::CacheStore;

/// Handle to the background flush task. Aborted explicitly on shutdown or
/// implicitly when dropped. Tests that need a flush call
/// [`CacheStore::flush_all`] directly instead of waiting on the timer.
pub struct FlushTimer {
    handle: JoinHandle<()>,
}

impl FlushTimer {
    /// Spawn a task that empties every cache at a fixed interval.
    pub fn spawn(cache: Arc<CacheStore>, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // Skip the first immediate tick
            loop {
                ticker.tick().await;
                info!(target = "brezza::cache", "flushing render caches");
                cache.flush_all().await;
            }
        });
        Self { handle }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for FlushTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
