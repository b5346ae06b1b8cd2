//! Stored Entry Module
//!
//! An opaque value held by the in-memory store together with its expiry.

use std::time::{Duration, Instant};

use bytes::Bytes;

// == Stored Entry ==
/// A single value held by the in-memory store.
///
/// Every entry carries a lifetime; the store never holds immortal values.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// The stored bytes, opaque to the store
    pub value: Bytes,
    /// When the entry was written
    pub created_at: Instant,
    /// When the entry stops being served
    pub expires_at: Instant,
}

impl StoredEntry {
    // == Constructor ==
    /// Creates a new entry that expires `ttl` from now.
    ///
    /// Returns `None` when the expiry instant is not representable on this
    /// platform's clock.
    pub fn new(value: Bytes, ttl: Duration) -> Option<Self> {
        let now = Instant::now();
        Some(Self {
            value,
            created_at: now,
            expires_at: now.checked_add(ttl)?,
        })
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches the expiration
    /// instant, so a fully elapsed lifetime is never served.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Size accounted against the store's per-entry limit.
    pub fn size(&self) -> usize {
        self.value.len()
    }
}
