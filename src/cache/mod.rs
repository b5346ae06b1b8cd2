//! Cache Module
//!
//! In-memory response store with TTL expiration and LRU eviction.

mod entry;
mod lru;
mod memory;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::StoredEntry;
pub use lru::LruTracker;
pub use memory::MemoryStore;
pub use stats::StoreStats;
pub use store::CacheStore;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
