//! In-Memory Backend
//!
//! Shares a [`CacheStore`] between requests behind a tokio `RwLock` and
//! exposes it through the [`ResponseStore`] contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::cache::{CacheStore, StoreStats};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::middleware::CacheKey;
use crate::store::ResponseStore;

/// Process-local backend with TTL expiry and LRU eviction.
///
/// Cloning is cheap and every clone sees the same entries.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<CacheStore>>,
}

impl MemoryStore {
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `max_entries` - Capacity before LRU eviction kicks in
    /// * `max_entry_bytes` - Largest encoded response the store accepts
    pub fn new(max_entries: usize, max_entry_bytes: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheStore::new(max_entries, max_entry_bytes))),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.max_entry_bytes)
    }

    /// Removes expired entries, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        self.inner.write().await.cleanup_expired()
    }

    pub async fn stats(&self) -> StoreStats {
        self.inner.read().await.stats()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Remaining lifetime of the entry stored under `key`.
    pub async fn ttl_remaining(&self, key: &CacheKey) -> Option<Duration> {
        self.inner.read().await.ttl_remaining(key.as_str())
    }
}

#[async_trait]
impl ResponseStore for MemoryStore {
    async fn exists(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.inner.read().await.contains(key.as_str()))
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>> {
        // Write lock: lookups update LRU order and stats
        let mut store = self.inner.write().await;
        match store.get(key.as_str()) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_absent() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn put(&self, key: &CacheKey, value: Bytes, lifetime: Duration) -> Result<()> {
        self.inner
            .write()
            .await
            .set(key.as_str().to_string(), value, lifetime)
    }
}
