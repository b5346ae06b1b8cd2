//! Tower and axum glue for [`ResponseCache`].

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tower::{Layer, Service};

use super::ResponseCache;

/// Applies a [`ResponseCache`] to the wrapped service.
///
/// ```ignore
/// let cache = ResponseCache::new(Arc::new(store), Duration::from_secs(300), Duration::from_secs(30));
/// let app = Router::new()
///     .route("/reports/:id", get(report))
///     .layer(cache.layer());
/// ```
#[derive(Debug, Clone)]
pub struct ResponseCacheLayer {
    cache: ResponseCache,
}

impl ResponseCacheLayer {
    pub fn new(cache: ResponseCache) -> Self {
        Self { cache }
    }
}

impl<S> Layer<S> for ResponseCacheLayer {
    type Service = ResponseCacheService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ResponseCacheService {
            inner,
            cache: self.cache.clone(),
        }
    }
}

/// Service produced by [`ResponseCacheLayer`].
#[derive(Debug, Clone)]
pub struct ResponseCacheService<S> {
    inner: S,
    cache: ResponseCache,
}

impl<S> Service<Request> for ResponseCacheService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // Use the service that was polled ready; leave a fresh clone in its place
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let cache = self.cache.clone();

        Box::pin(async move {
            cache
                .serve(request, move |request| inner.call(request))
                .await
        })
    }
}

/// The same cache as an `axum::middleware::from_fn_with_state` function.
///
/// ```ignore
/// let app = Router::new()
///     .route("/feed", get(feed))
///     .layer(axum::middleware::from_fn_with_state(cache, cache_responses));
/// ```
pub async fn cache_responses(
    State(cache): State<ResponseCache>,
    request: Request,
    next: Next,
) -> Response {
    let served = cache
        .serve(request, |request| async move {
            Ok::<_, Infallible>(next.run(request).await)
        })
        .await;

    match served {
        Ok(response) => response,
        Err(never) => match never {},
    }
}
