//! Network access for resource fetches
//!
//! Provides a trait for fetching a resource URL that can be implemented by
//! different backends (HTTP origin, local build directory).

mod http;
mod local;

pub use http::HttpFetcher;
pub use local::LocalFetcher;

use crate::error::PrecacheResult;
use async_trait::async_trait;
use url::Url;

/// A fetched (or cached) response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,

    /// Value of the Content-Type header, if any
    pub content_type: Option<String>,

    /// Response body
    pub body: Vec<u8>,
}

impl Response {
    /// A 200 response without content type
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    /// 2xx status; only such responses are ever written to a cache
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Cache behaviour requested from the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Let intermediaries answer from their caches
    Default,
    /// Bypass every intermediate cache and revalidate with the origin
    Reload,
}

/// Abstract resource fetcher
///
/// An `Err` means the transport failed. A non-2xx answer from the origin is
/// still an `Ok` response; callers decide what a bad status means for them.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch one URL
    async fn fetch(&self, url: &Url, mode: FetchMode) -> PrecacheResult<Response>;

    /// Human-readable backend name for display
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        assert!(Response::ok("x").is_success());
        assert!(Response::with_status(204, "").is_success());
        assert!(!Response::with_status(304, "").is_success());
        assert!(!Response::with_status(404, "").is_success());
        assert!(!Response::with_status(500, "").is_success());
    }
}
