//! Cache key derivation.

use std::fmt;

use axum::http::{Request, Uri};
use sha2::{Digest, Sha256};

// == Cache Key ==
/// Opaque, fixed-length key identifying a cached response.
///
/// The key is the hex-encoded SHA-256 of the request's normalized URL. It is
/// a pure function of the URL: method, headers and body are ignored, so the
/// middleware must only front idempotent, URL-determined routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Length of every key in characters.
    pub const LEN: usize = 64;

    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::from_uri(request.uri())
    }

    pub fn from_uri(uri: &Uri) -> Self {
        Self::from_url(&normalize(uri))
    }

    /// Hashes an already normalized URL string.
    pub fn from_url(url: &str) -> Self {
        Self(format!("{:x}", Sha256::digest(url.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds `scheme://authority/path?query` from whatever parts the URI carries.
///
/// Servers usually see origin-form URIs, in which case only path and query
/// contribute. Scheme and host are case-insensitive and get lower-cased; path
/// and query are kept verbatim so query-only differences stay distinct.
fn normalize(uri: &Uri) -> String {
    let mut url = String::new();
    if let Some(scheme) = uri.scheme_str() {
        url.push_str(&scheme.to_ascii_lowercase());
        url.push_str("://");
    }
    if let Some(authority) = uri.authority() {
        url.push_str(&authority.as_str().to_ascii_lowercase());
    }
    url.push_str(uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/"));
    url
}
