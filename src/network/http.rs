//! HTTP fetcher backed by reqwest

use super::{FetchMode, Fetcher, Response};
use crate::error::{PrecacheError, PrecacheResult};
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Fetches resources from the origin server.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the given per-request timeout
    pub fn new(timeout: Duration) -> PrecacheResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("precache/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PrecacheError::network("client setup", e))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, mode: FetchMode) -> PrecacheResult<Response> {
        let mut request = self.client.get(url.clone());
        if mode == FetchMode::Reload {
            request = request
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }

        let response = request
            .send()
            .await
            .map_err(|e| PrecacheError::network(url.as_str(), e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| PrecacheError::network(url.as_str(), e))?;

        debug!(url = %url, status, bytes = body.len(), ?mode, "Fetched");

        Ok(Response {
            status,
            content_type,
            body: body.to_vec(),
        })
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
