//! Error types for the response cache
//!
//! Provides unified error handling using thiserror. None of these errors ever
//! reach an HTTP client: the middleware logs them and degrades to a miss.

use std::time::Duration;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in the in-memory engine
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key has expired
    #[error("Key expired: {0}")]
    Expired(String),

    /// Entry rejected by the store (key or value outside limits, zero lifetime)
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    /// Cache is full and eviction failed
    #[error("Cache full: {0}")]
    CacheFull(String),

    /// Backend could not serve the request
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Backend did not answer within the configured deadline
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    /// Stored bytes do not decode into a cached response
    #[error("Malformed cache entry: {0}")]
    Malformed(String),

    /// A captured response could not be encoded for storage
    #[error("Encode failed: {0}")]
    Encode(String),
}

impl CacheError {
    /// Returns true for the "entry is simply absent" family of errors.
    pub fn is_absent(&self) -> bool {
        matches!(self, CacheError::NotFound(_) | CacheError::Expired(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
