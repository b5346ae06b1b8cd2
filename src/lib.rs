//! Response Cache - cache-aside HTTP response caching middleware
//!
//! Stores complete responses keyed by request URL and replays them for later
//! requests within a lifetime chosen by response status. Store failures never
//! reach the client; the cache fails open.
//!
//! ```ignore
//! let config = CacheConfig::from_env();
//! let store = MemoryStore::from_config(&config);
//! let _cleanup = spawn_cleanup_task(store.clone(), config.cleanup_interval());
//! let cache = ResponseCache::from_config(Arc::new(store), &config);
//!
//! let app = Router::new()
//!     .route("/articles/:id", get(article))
//!     .layer(cache.layer());
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod store;
pub mod tasks;

pub use cache::MemoryStore;
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use middleware::{
    cache_responses, CacheKey, CacheStats, CachedResponse, LifetimePolicy, ResponseCache,
    ResponseCacheLayer, CACHE_STATUS_HEADER,
};
pub use store::ResponseStore;
pub use tasks::spawn_cleanup_task;
