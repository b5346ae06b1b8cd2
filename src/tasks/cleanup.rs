//! TTL Cleanup Task
//!
//! Background task that periodically purges expired responses from the
//! in-memory store. Expired entries are never served either way; this only
//! bounds the memory they hold until their key is requested again.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::MemoryStore;

/// Spawns a task that purges expired entries from `store` every `interval`.
///
/// The returned handle is meant to be aborted on shutdown.
///
/// # Example
/// ```ignore
/// let store = MemoryStore::from_config(&config);
/// let cleanup = spawn_cleanup_task(store.clone(), config.cleanup_interval());
/// // Later, during shutdown:
/// cleanup.abort();
/// ```
pub fn spawn_cleanup_task(store: MemoryStore, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?interval, "starting response cache cleanup task");

        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = store.purge_expired().await;
            if removed > 0 {
                let stats = store.stats().await;
                info!(
                    entries = stats.total_entries,
                    hit_rate = stats.hit_rate(),
                    "TTL cleanup: removed {} expired responses",
                    removed
                );
            } else {
                debug!("TTL cleanup: no expired responses found");
            }
        }
    })
}
