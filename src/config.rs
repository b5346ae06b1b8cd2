//! Configuration Module
//!
//! Handles loading cache settings from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::middleware::LifetimePolicy;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime in seconds for responses with status < 400 (zero or less disables)
    pub success_ttl_secs: i64,
    /// Lifetime in seconds for responses with status >= 400 (zero or less disables)
    pub negative_ttl_secs: i64,
    /// Maximum number of entries the in-memory store can hold
    pub max_entries: usize,
    /// Maximum encoded size of a single stored entry
    pub max_entry_bytes: usize,
    /// Maximum response body size the middleware will record
    pub max_body_bytes: usize,
    /// Deadline for a single store call in milliseconds
    pub store_timeout_ms: u64,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL` - Success lifetime in seconds (default: 300)
    /// - `CACHE_NEGATIVE_TTL` - Error lifetime in seconds (default: 30)
    /// - `CACHE_MAX_ENTRIES` - Maximum store entries (default: 1000)
    /// - `CACHE_MAX_ENTRY_BYTES` - Maximum encoded entry size (default: 2 MiB)
    /// - `CACHE_MAX_BODY_BYTES` - Maximum recorded body size (default: 1 MiB)
    /// - `CACHE_STORE_TIMEOUT_MS` - Store call deadline (default: 250)
    /// - `CACHE_CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            success_ttl_secs: env_or("CACHE_TTL", defaults.success_ttl_secs),
            negative_ttl_secs: env_or("CACHE_NEGATIVE_TTL", defaults.negative_ttl_secs),
            max_entries: env_or("CACHE_MAX_ENTRIES", defaults.max_entries),
            max_entry_bytes: env_or("CACHE_MAX_ENTRY_BYTES", defaults.max_entry_bytes),
            max_body_bytes: env_or("CACHE_MAX_BODY_BYTES", defaults.max_body_bytes),
            store_timeout_ms: env_or("CACHE_STORE_TIMEOUT_MS", defaults.store_timeout_ms),
            cleanup_interval: env_or("CACHE_CLEANUP_INTERVAL", defaults.cleanup_interval),
        }
    }

    /// Lifetime policy described by the two configured lifetimes.
    pub fn policy(&self) -> LifetimePolicy {
        LifetimePolicy::from_secs(self.success_ttl_secs, self.negative_ttl_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            success_ttl_secs: 300,
            negative_ttl_secs: 30,
            max_entries: 1000,
            max_entry_bytes: 2 * 1024 * 1024,
            max_body_bytes: 1024 * 1024,
            store_timeout_ms: 250,
            cleanup_interval: 1,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
