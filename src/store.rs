//! Store Contract
//!
//! The capability set the middleware needs from a key-value backend. Entries
//! are opaque bytes to the store; expiry and eviction are entirely the
//! backend's business.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::middleware::CacheKey;

/// Backend consumed by [`ResponseCache`](crate::middleware::ResponseCache).
///
/// Implementations are shared by every in-flight request, so they must be
/// safe to call concurrently; the middleware adds no locking of its own.
/// Writes are last-write-wins.
#[async_trait]
pub trait ResponseStore: Send + Sync + 'static {
    /// Returns true if a live entry is stored under `key`.
    async fn exists(&self, key: &CacheKey) -> Result<bool>;

    /// Fetches the entry stored under `key`, `None` if absent or expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>>;

    /// Stores `value` under `key` for `lifetime`. The lifetime is never zero.
    async fn put(&self, key: &CacheKey, value: Bytes, lifetime: Duration) -> Result<()>;
}
