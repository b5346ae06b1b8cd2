//! Cached response record and its storage encoding.
//!
//! Stored layout: a big-endian `u32` length, that many bytes of JSON metadata
//! (status and ordered header pairs), then the raw body.

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

const LENGTH_PREFIX: usize = 4;

// == Cached Response ==
/// Immutable snapshot of a complete response: status, every header value in
/// order (repeated names included), and the body bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

/// JSON part of the stored layout.
#[derive(Serialize, Deserialize)]
struct EntryMeta {
    status: u16,
    headers: Vec<(String, Vec<u8>)>,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    // == Encode ==
    /// Serializes the response into the opaque bytes handed to a store.
    pub fn encode(&self) -> Result<Bytes> {
        let meta = EntryMeta {
            status: self.status.as_u16(),
            headers: self
                .headers
                .iter()
                .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
                .collect(),
        };
        let meta = serde_json::to_vec(&meta).map_err(|e| CacheError::Encode(e.to_string()))?;
        let meta_len = u32::try_from(meta.len())
            .map_err(|_| CacheError::Encode("header block exceeds u32 length".to_string()))?;

        let mut buf = BytesMut::with_capacity(LENGTH_PREFIX + meta.len() + self.body.len());
        buf.put_u32(meta_len);
        buf.put_slice(&meta);
        buf.put_slice(&self.body);
        Ok(buf.freeze())
    }

    // == Decode ==
    /// Rebuilds a response from stored bytes.
    ///
    /// Any deviation from the expected layout is reported as `Malformed`;
    /// callers treat that exactly like a missing entry.
    pub fn decode(mut bytes: Bytes) -> Result<Self> {
        if bytes.len() < LENGTH_PREFIX {
            return Err(CacheError::Malformed("missing length prefix".to_string()));
        }
        let meta_len = bytes.get_u32() as usize;
        if bytes.len() < meta_len {
            return Err(CacheError::Malformed(format!(
                "header block of {} bytes truncated to {}",
                meta_len,
                bytes.len()
            )));
        }

        let meta_bytes = bytes.split_to(meta_len);
        let meta: EntryMeta = serde_json::from_slice(&meta_bytes)
            .map_err(|e| CacheError::Malformed(format!("header block: {}", e)))?;

        let status = StatusCode::from_u16(meta.status)
            .map_err(|_| CacheError::Malformed(format!("invalid status {}", meta.status)))?;

        let mut headers = HeaderMap::with_capacity(meta.headers.len());
        for (name, value) in meta.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| CacheError::Malformed(format!("invalid header name {:?}", name)))?;
            let value = HeaderValue::from_bytes(&value)
                .map_err(|_| CacheError::Malformed(format!("invalid value for header {}", name)))?;
            headers.append(name, value);
        }

        Ok(Self {
            status,
            headers,
            body: bytes,
        })
    }
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
