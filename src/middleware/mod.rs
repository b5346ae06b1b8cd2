//! Response Caching Middleware
//!
//! Cache-aside in front of any handler chain. Per request:
//!
//! 1. derive a [`CacheKey`] from the URL and ask the store whether it exists;
//! 2. on a hit, decode the stored [`CachedResponse`] and replay it with
//!    `x-cache-status: HIT`;
//! 3. on a miss (or any store/decode failure), run the downstream handler,
//!    mark the response `x-cache-status: MISS` and tee its body;
//! 4. once the body has streamed completely, store it for the lifetime the
//!    [`LifetimePolicy`] picks for its status.
//!
//! Every store interaction is best effort. Failures are logged and counted,
//! and the request carries on as if caching were switched off.
//!
//! Concurrent misses on the same key each run the handler and each store a
//! result; there is no request coalescing.

mod capture;
mod key;
mod layer;
mod metrics;
mod policy;
mod response;

#[cfg(test)]
mod property_tests;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::CONTENT_LENGTH;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use http_body::Body as HttpBody;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::store::ResponseStore;

use capture::{CaptureBody, Recorder};

pub use key::CacheKey;
pub use layer::{cache_responses, ResponseCacheLayer, ResponseCacheService};
pub use metrics::{CacheMetrics, CacheStats};
pub use policy::LifetimePolicy;
pub use response::CachedResponse;

/// Header reporting whether the cache layer answered the request.
pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

const HIT: &str = "HIT";
const MISS: &str = "MISS";

// == Response Cache ==
/// A cache instance: store, lifetime policy, limits and counters.
///
/// Cloning is cheap and clones share everything, so one instance can front
/// several routes while another, with a different store or policy, fronts
/// others.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn ResponseStore>,
    policy: LifetimePolicy,
    max_body_bytes: usize,
    store_timeout: Duration,
    metrics: CacheMetrics,
}

impl ResponseCache {
    /// Creates a cache over `store`.
    ///
    /// # Arguments
    /// * `success_ttl` - Lifetime for responses with status < 400
    /// * `negative_ttl` - Lifetime for responses with status >= 400
    ///
    /// A zero lifetime disables caching for that class of response.
    pub fn new(store: Arc<dyn ResponseStore>, success_ttl: Duration, negative_ttl: Duration) -> Self {
        Self::builder(store)
            .policy(LifetimePolicy::new(success_ttl, negative_ttl))
            .build()
    }

    pub fn builder(store: Arc<dyn ResponseStore>) -> ResponseCacheBuilder {
        ResponseCacheBuilder::new(store)
    }

    /// Creates a cache over `store` with lifetimes and limits from `config`.
    pub fn from_config(store: Arc<dyn ResponseStore>, config: &CacheConfig) -> Self {
        Self::builder(store)
            .policy(config.policy())
            .max_body_bytes(config.max_body_bytes)
            .store_timeout(config.store_timeout())
            .build()
    }

    /// Tower layer applying this cache to a service.
    pub fn layer(&self) -> ResponseCacheLayer {
        ResponseCacheLayer::new(self.clone())
    }

    pub fn policy(&self) -> LifetimePolicy {
        self.inner.policy
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.metrics.snapshot()
    }

    pub(crate) fn metrics(&self) -> &CacheMetrics {
        &self.inner.metrics
    }

    // == Serve ==
    /// Answers `request` from the cache, or through `next` on a miss.
    ///
    /// Errors from `next` are returned untouched; the cache itself never
    /// produces one.
    pub async fn serve<F, Fut, E>(&self, request: Request, next: F) -> std::result::Result<Response, E>
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = std::result::Result<Response, E>>,
    {
        let key = CacheKey::from_request(&request);

        if let Some(entry) = self.lookup(&key).await {
            self.inner.metrics.record_hit();
            debug!(%key, status = %entry.status(), "cache hit");
            let mut response = entry.into_response();
            response
                .headers_mut()
                .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(HIT));
            return Ok(response);
        }

        self.inner.metrics.record_miss();
        debug!(%key, uri = %request.uri(), "cache miss");
        let response = next(request).await?;
        Ok(self.capture(key, response))
    }

    /// Fetches and decodes the entry for `key`, `None` on any failure.
    async fn lookup(&self, key: &CacheKey) -> Option<CachedResponse> {
        match self.bounded(self.inner.store.exists(key)).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(err) => {
                self.inner.metrics.record_store_error();
                warn!(%key, error = %err, "cache existence check failed, treating as miss");
                return None;
            }
        }

        let bytes = match self.bounded(self.inner.store.get(key)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(%key, "entry expired between existence check and fetch");
                return None;
            }
            Err(err) => {
                self.inner.metrics.record_store_error();
                warn!(%key, error = %err, "cache fetch failed, treating as miss");
                return None;
            }
        };

        match CachedResponse::decode(bytes) {
            Ok(entry) => Some(entry),
            Err(err) => {
                self.inner.metrics.record_malformed();
                warn!(%key, error = %err, "stored entry unreadable, treating as miss");
                None
            }
        }
    }

    /// Marks a downstream response as a miss and arranges for it to be stored.
    fn capture(&self, key: CacheKey, response: Response) -> Response {
        let (mut parts, body) = response.into_parts();
        let limit = self.inner.max_body_bytes;

        let recorder = match self.inner.policy.lifetime_for(parts.status) {
            None => {
                self.inner.metrics.record_skipped();
                debug!(%key, status = %parts.status, "lifetime disabled for status, not caching");
                None
            }
            Some(_) if body.size_hint().lower() > limit as u64 => {
                self.inner.metrics.record_skipped();
                debug!(%key, limit, "response body larger than capture limit, not caching");
                None
            }
            Some(lifetime) => {
                // The marker belongs to this layer, never to the stored entry
                let mut headers = parts.headers.clone();
                headers.remove(&CACHE_STATUS_HEADER);
                let expected_len = body
                    .size_hint()
                    .exact()
                    .or_else(|| declared_length(&parts.headers));
                Some(Recorder::new(
                    self.clone(),
                    key,
                    parts.status,
                    headers,
                    lifetime,
                    limit,
                    expected_len,
                ))
            }
        };

        parts
            .headers
            .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(MISS));

        let body = match recorder {
            Some(recorder) => Body::new(CaptureBody::new(body, recorder)),
            None => body,
        };
        Response::from_parts(parts, body)
    }

    // == Persist ==
    /// Writes a completed capture to the store. Failures are logged and counted.
    pub(crate) async fn persist(&self, key: &CacheKey, entry: CachedResponse, lifetime: Duration) {
        let status = entry.status();
        let encoded = match entry.encode() {
            Ok(encoded) => encoded,
            Err(err) => {
                self.inner.metrics.record_skipped();
                warn!(%key, error = %err, "captured response could not be encoded");
                return;
            }
        };

        match self.bounded(self.inner.store.put(key, encoded, lifetime)).await {
            Ok(()) => {
                self.inner.metrics.record_store();
                debug!(%key, %status, ?lifetime, "response stored");
            }
            Err(err) => {
                self.inner.metrics.record_store_error();
                warn!(%key, error = %err, "failed to store response");
            }
        }
    }

    /// Runs a store call under the configured deadline.
    async fn bounded<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let deadline = self.inner.store_timeout;
        tokio::time::timeout(deadline, call)
            .await
            .map_err(|_| CacheError::Timeout(deadline))?
    }
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers.get(CONTENT_LENGTH)?.to_str().ok()?.parse().ok()
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("policy", &self.inner.policy)
            .field("max_body_bytes", &self.inner.max_body_bytes)
            .field("store_timeout", &self.inner.store_timeout)
            .field("stats", &self.inner.metrics.snapshot())
            .finish_non_exhaustive()
    }
}

// == Builder ==
/// Builder for [`ResponseCache`]; unset options take [`CacheConfig`] defaults.
pub struct ResponseCacheBuilder {
    store: Arc<dyn ResponseStore>,
    policy: LifetimePolicy,
    max_body_bytes: usize,
    store_timeout: Duration,
}

impl ResponseCacheBuilder {
    fn new(store: Arc<dyn ResponseStore>) -> Self {
        let defaults = CacheConfig::default();
        Self {
            store,
            policy: defaults.policy(),
            max_body_bytes: defaults.max_body_bytes,
            store_timeout: defaults.store_timeout(),
        }
    }

    pub fn policy(mut self, policy: LifetimePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn lifetimes(self, success_ttl: Duration, negative_ttl: Duration) -> Self {
        self.policy(LifetimePolicy::new(success_ttl, negative_ttl))
    }

    /// Largest body that will be recorded; bigger responses still stream but aren't cached.
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Deadline for each individual store call.
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn build(self) -> ResponseCache {
        debug!(
            success_ttl = ?self.policy.success(),
            negative_ttl = ?self.policy.negative(),
            max_body_bytes = self.max_body_bytes,
            store_timeout = ?self.store_timeout,
            "response cache configured"
        );
        ResponseCache {
            inner: Arc::new(Inner {
                store: self.store,
                policy: self.policy,
                max_body_bytes: self.max_body_bytes,
                store_timeout: self.store_timeout,
                metrics: CacheMetrics::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use axum::http::{header::CONTENT_TYPE, StatusCode};
    use std::convert::Infallible;

    fn cache(store: &MemoryStore) -> ResponseCache {
        ResponseCache::new(
            Arc::new(store.clone()),
            Duration::from_secs(60),
            Duration::from_secs(5),
        )
    }

    fn get(uri: &str) -> Request {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn ok(_request: Request) -> std::result::Result<Response, Infallible> {
        Ok(([(CONTENT_TYPE, "text/plain")], "ok").into_response())
    }

    async fn not_called(_request: Request) -> std::result::Result<Response, Infallible> {
        panic!("downstream called on a hit")
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let store = MemoryStore::new(10, 1024 * 1024);
        let cache = cache(&store);

        let first = cache.serve(get("/foo"), ok).await.unwrap();
        assert_eq!(first.headers()[&CACHE_STATUS_HEADER], MISS);
        assert_eq!(body_string(first).await, "ok");

        let second = cache.serve(get("/foo"), not_called).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(second.headers()[&CACHE_STATUS_HEADER], HIT);
        assert_eq!(second.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(body_string(second).await, "ok");

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.stores), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_downstream_error_passes_through() {
        let store = MemoryStore::new(10, 1024);
        let cache = cache(&store);

        let result = cache
            .serve(get("/boom"), |_| async { Err::<Response, _>("downstream failed") })
            .await;

        assert_eq!(result.unwrap_err(), "downstream failed");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_disabled_status_class_is_not_stored() {
        let store = MemoryStore::new(10, 1024);
        let cache = ResponseCache::new(
            Arc::new(store.clone()),
            Duration::from_secs(60),
            Duration::ZERO,
        );

        let response = cache
            .serve(get("/missing"), |_| async {
                Ok::<_, Infallible>(StatusCode::NOT_FOUND.into_response())
            })
            .await
            .unwrap();
        assert_eq!(response.headers()[&CACHE_STATUS_HEADER], MISS);
        body_string(response).await;

        assert!(store.is_empty().await);
        assert_eq!(cache.stats().skipped, 1);
    }

    #[tokio::test]
    async fn test_from_config() {
        let config = CacheConfig {
            success_ttl_secs: 10,
            negative_ttl_secs: 0,
            ..CacheConfig::default()
        };
        let store = MemoryStore::from_config(&config);
        let cache = ResponseCache::from_config(Arc::new(store), &config);

        assert_eq!(
            cache.policy(),
            LifetimePolicy::new(Duration::from_secs(10), Duration::ZERO)
        );
    }
}
