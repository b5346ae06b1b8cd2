//! Response capture.
//!
//! [`CaptureBody`] wraps a downstream response body. Each data frame is handed
//! to the client unchanged and copied into a [`Recorder`]. When the inner body
//! reaches end-of-stream the recording becomes a [`CachedResponse`] and is
//! persisted before end-of-stream is passed on.
//!
//! HTTP/1 connections with a known length stop polling once the last byte is
//! written and drop the body. A recording that is already complete at that
//! point (inner body reported its end, or the expected length was reached) is
//! handed to the runtime to finish storing. Anything less is never stored: a
//! body that errors, carries trailers, outgrows the capture limit, or is
//! dropped early is abandoned.

use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use bytes::{Bytes, BytesMut};
use http_body::{Body as HttpBody, Frame, SizeHint};
use tracing::debug;

use super::{CacheKey, CachedResponse, ResponseCache};

type StoreFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

// == Recorder ==
/// In-memory copy of a response being streamed to the client.
pub(crate) struct Recorder {
    cache: ResponseCache,
    key: CacheKey,
    status: StatusCode,
    headers: HeaderMap,
    lifetime: Duration,
    body: BytesMut,
    limit: usize,
    /// Body length announced up front, if any
    expected_len: Option<u64>,
    /// Inner body reported end-of-stream
    finished: bool,
}

impl Recorder {
    pub(crate) fn new(
        cache: ResponseCache,
        key: CacheKey,
        status: StatusCode,
        headers: HeaderMap,
        lifetime: Duration,
        limit: usize,
        expected_len: Option<u64>,
    ) -> Self {
        Self {
            cache,
            key,
            status,
            headers,
            lifetime,
            body: BytesMut::new(),
            limit,
            expected_len,
            finished: false,
        }
    }

    /// Appends a chunk, returning false once the capture limit would be exceeded.
    fn record(&mut self, chunk: &Bytes) -> bool {
        if self.body.len() + chunk.len() > self.limit {
            return false;
        }
        self.body.extend_from_slice(chunk);
        true
    }

    fn is_complete(&self) -> bool {
        self.finished || self.expected_len == Some(self.body.len() as u64)
    }

    async fn persist(self) {
        let entry = CachedResponse::new(self.status, self.headers, self.body.freeze());
        self.cache.persist(&self.key, entry, self.lifetime).await;
    }

    fn abandon(self, reason: &'static str) {
        self.cache.metrics().record_skipped();
        debug!(key = %self.key, status = %self.status, reason, "response capture abandoned, not caching");
    }
}

enum CaptureState {
    Recording(Recorder),
    Storing(StoreFuture),
    Done,
}

// == Capture Body ==
/// Tee body: streams to the client while recording for the store.
pub(crate) struct CaptureBody {
    inner: Body,
    state: CaptureState,
    cache: ResponseCache,
}

impl CaptureBody {
    pub(crate) fn new(inner: Body, recorder: Recorder) -> Self {
        Self {
            inner,
            cache: recorder.cache.clone(),
            state: CaptureState::Recording(recorder),
        }
    }

    /// Finishes a store of a fully delivered response after its body is gone.
    fn detach(&self, store: StoreFuture) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(store);
            }
            Err(_) => {
                self.cache.metrics().record_skipped();
                debug!("no runtime available, captured response not stored");
            }
        }
    }

    fn abandon(&mut self, reason: &'static str) {
        if let CaptureState::Recording(recorder) =
            std::mem::replace(&mut self.state, CaptureState::Done)
        {
            recorder.abandon(reason);
        }
    }
}

impl HttpBody for CaptureBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        if let CaptureState::Storing(store) = &mut this.state {
            ready!(store.as_mut().poll(cx));
            this.state = CaptureState::Done;
            return Poll::Ready(None);
        }

        match ready!(Pin::new(&mut this.inner).poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let CaptureState::Recording(recorder) = &mut this.state {
                    match frame.data_ref() {
                        Some(chunk) => {
                            if recorder.record(chunk) {
                                recorder.finished = this.inner.is_end_stream();
                            } else {
                                this.abandon("body exceeds capture limit");
                            }
                        }
                        None => this.abandon("response carries trailers"),
                    }
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(err)) => {
                this.abandon("downstream body failed");
                Poll::Ready(Some(Err(err)))
            }
            None => match std::mem::replace(&mut this.state, CaptureState::Done) {
                CaptureState::Recording(mut recorder) => {
                    recorder.finished = true;
                    let mut store: StoreFuture = Box::pin(recorder.persist());
                    match store.as_mut().poll(cx) {
                        Poll::Ready(()) => Poll::Ready(None),
                        Poll::Pending => {
                            this.state = CaptureState::Storing(store);
                            Poll::Pending
                        }
                    }
                }
                _ => Poll::Ready(None),
            },
        }
    }

    fn is_end_stream(&self) -> bool {
        // Stay open while recording so a polling consumer reaches the store step
        match self.state {
            CaptureState::Done => self.inner.is_end_stream(),
            _ => false,
        }
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for CaptureBody {
    fn drop(&mut self) {
        match std::mem::replace(&mut self.state, CaptureState::Done) {
            CaptureState::Recording(recorder) if recorder.is_complete() => {
                self.detach(Box::pin(recorder.persist()))
            }
            CaptureState::Recording(recorder) => {
                recorder.abandon("response dropped before completion")
            }
            CaptureState::Storing(store) => self.detach(store),
            CaptureState::Done => {}
        }
    }
}
