//! Per-request routing between the content cache and the network
//!
//! Only `GET` requests for manifest keys are intercepted. The root document
//! is served online-first so a redeploy is picked up without a full upgrade;
//! every other resource is served cache-first and filled lazily.

use crate::context::WorkerContext;
use crate::error::PrecacheResult;
use crate::manifest::ResourceKey;
use crate::network::{FetchMode, Response};
use crate::request::Request;
use reqwest::Method;
use tracing::{debug, info, warn};
use url::Url;

/// How a request will be handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Not ours; the caller performs a plain network request
    Passthrough,
    /// Root document: network first, cache on failure
    OnlineFirst(Url),
    /// Any other manifest resource: cache first, fill on miss
    CacheFirst { key: ResourceKey, url: Url },
}

/// Result of handling one request
#[derive(Debug)]
pub enum FetchOutcome {
    Passthrough,
    Response(Response),
}

/// Routes requests for one instance
#[derive(Clone)]
pub struct FetchInterceptor {
    ctx: WorkerContext,
}

impl FetchInterceptor {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx }
    }

    /// Decide the route without touching cache or network
    pub fn route(&self, request: &Request) -> Route {
        if request.method != Method::GET {
            return Route::Passthrough;
        }
        let Ok(url) = self.ctx.normalizer.resolve(&request.url) else {
            return Route::Passthrough;
        };
        let Some(key) = self.ctx.normalizer.key_for(&url) else {
            return Route::Passthrough;
        };
        if !self.ctx.release.manifest().contains(&key) {
            return Route::Passthrough;
        }

        if key.is_root() {
            Route::OnlineFirst(url)
        } else {
            Route::CacheFirst { key, url }
        }
    }

    /// Handle one request
    ///
    /// Errors are request-level failures for the caller to judge.
    pub async fn handle(&self, request: &Request) -> PrecacheResult<FetchOutcome> {
        let response = match self.route(request) {
            Route::Passthrough => return Ok(FetchOutcome::Passthrough),
            Route::OnlineFirst(url) => self.online_first(&url).await?,
            Route::CacheFirst { key, url } => self.cache_first(&key, &url).await?,
        };
        Ok(FetchOutcome::Response(response))
    }

    async fn cache_first(&self, key: &ResourceKey, url: &Url) -> PrecacheResult<Response> {
        let content = &self.ctx.namespaces.content;
        match self.ctx.storage.get(content, key).await {
            Ok(Some(cached)) => {
                debug!("Cache hit: {}", key);
                return Ok(cached);
            }
            Ok(None) => debug!("Cache miss: {}", key),
            Err(e) => {
                // Unreadable entries are refetched like a miss
                warn!("Dropping unreadable cache entry {}: {}", key, e);
                if let Err(e) = self.ctx.storage.delete(content, key).await {
                    warn!("Failed to delete {}: {}", key, e);
                }
            }
        }

        let response = self.ctx.fetcher.fetch(url, FetchMode::Default).await?;
        if response.is_success() {
            self.store(key, &response).await;
        }
        Ok(response)
    }

    async fn online_first(&self, url: &Url) -> PrecacheResult<Response> {
        let root = ResourceKey::root();
        match self.ctx.fetcher.fetch(url, FetchMode::Default).await {
            Ok(response) => {
                if response.is_success() {
                    self.store(&root, &response).await;
                }
                Ok(response)
            }
            Err(network_error) => {
                match self.ctx.storage.get(&self.ctx.namespaces.content, &root).await {
                    Ok(Some(cached)) => {
                        info!("Network unavailable, serving cached root document: {}", network_error);
                        Ok(cached)
                    }
                    Ok(None) => Err(network_error),
                    Err(e) => {
                        warn!("Cache lookup for root document failed: {}", e);
                        Err(network_error)
                    }
                }
            }
        }
    }

    /// Write a copy to the content cache; a failed write never fails the request
    async fn store(&self, key: &ResourceKey, response: &Response) {
        if let Err(e) = self
            .ctx
            .storage
            .put(&self.ctx.namespaces.content, key, response)
            .await
        {
            warn!("Failed to cache {}: {}", key, e);
        }
    }
}
