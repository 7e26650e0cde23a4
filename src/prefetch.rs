//! Bulk fill of every manifest resource not yet cached
//!
//! Runs on explicit command only. The missing subset is fetched as one
//! batch and written only once every fetch succeeded.

use crate::context::WorkerContext;
use crate::error::{PrecacheError, PrecacheResult};
use crate::manifest::ResourceKey;
use crate::network::{FetchMode, Response};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// What a prefetch run stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefetchReport {
    /// Manifest keys already cached before the run
    pub already_cached: usize,
    /// Keys fetched and stored by this run
    pub fetched: Vec<ResourceKey>,
}

#[derive(Clone)]
pub struct OfflinePrefetcher {
    ctx: WorkerContext,
}

impl OfflinePrefetcher {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx }
    }

    /// Manifest keys with no content cache entry
    pub async fn missing(&self) -> PrecacheResult<Vec<ResourceKey>> {
        let cached: BTreeSet<ResourceKey> = self
            .ctx
            .storage
            .keys(&self.ctx.namespaces.content)
            .await?
            .into_iter()
            .collect();

        Ok(self
            .ctx
            .release
            .manifest()
            .keys()
            .filter(|key| !cached.contains(*key))
            .cloned()
            .collect())
    }

    pub async fn prefetch_all(&self) -> PrecacheResult<PrefetchReport> {
        self.prefetch_all_with_progress(&|_, _| {}).await
    }

    /// Fetch and store every missing resource, reporting `(done, total)`
    ///
    /// Any failure rejects the whole batch; nothing from it is stored.
    pub async fn prefetch_all_with_progress(
        &self,
        on_progress: &(dyn Fn(usize, usize) + Send + Sync),
    ) -> PrecacheResult<PrefetchReport> {
        let missing = self.missing().await?;
        let total = missing.len();
        let already_cached = self.ctx.release.manifest().len() - total;

        if missing.is_empty() {
            info!("All {} manifest resources already cached", already_cached);
            return Ok(PrefetchReport {
                already_cached,
                fetched: vec![],
            });
        }

        info!("Prefetching {} of {} resources", total, self.ctx.release.manifest().len());
        let done = &AtomicUsize::new(0);
        let batch = stream::iter(missing.iter().cloned())
            .map(|key: ResourceKey| async move {
                let response = self.fetch(&key).await?;
                on_progress(done.fetch_add(1, Ordering::SeqCst) + 1, total);
                Ok::<_, PrecacheError>((key, response))
            })
            .buffer_unordered(self.ctx.max_concurrent_fetches)
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| PrecacheError::PrefetchFailed {
                missing: total,
                source: Box::new(e),
            })?;

        for (key, response) in &batch {
            self.ctx
                .storage
                .put(&self.ctx.namespaces.content, key, response)
                .await
                .map_err(|e| PrecacheError::PrefetchFailed {
                    missing: total,
                    source: Box::new(e),
                })?;
            debug!("Prefetched {}", key);
        }

        Ok(PrefetchReport {
            already_cached,
            fetched: missing,
        })
    }

    async fn fetch(&self, key: &ResourceKey) -> PrecacheResult<Response> {
        let url = self.ctx.normalizer.url_for(key)?;
        let response = self.ctx.fetcher.fetch(&url, FetchMode::Default).await?;
        if !response.is_success() {
            return Err(PrecacheError::BadStatus {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CacheStorage;
    use crate::testing::{self, MockFetcher};
    use std::sync::{Arc, Mutex};

    const MANIFEST: &[(&str, &str)] = &[
        ("/", "h0"),
        ("a.js", "h1"),
        ("b.js", "h2"),
        ("c.png", "h3"),
        ("d.json", "h4"),
    ];

    async fn seeded(fetcher: Arc<MockFetcher>) -> WorkerContext {
        let ctx = testing::context(testing::release(MANIFEST, &[]), fetcher);
        for key in ["/", "a.js"] {
            ctx.storage
                .put(&ctx.namespaces.content, &ResourceKey::new(key), &Response::ok("cached"))
                .await
                .unwrap();
        }
        ctx
    }

    #[tokio::test]
    async fn fetches_only_missing_subset() {
        let fetcher = MockFetcher::new();
        for key in ["b.js", "c.png", "d.json"] {
            fetcher.serve(key, key);
        }
        let ctx = seeded(fetcher.clone()).await;
        let prefetcher = OfflinePrefetcher::new(ctx.clone());

        let report = prefetcher.prefetch_all().await.unwrap();
        assert_eq!(report.already_cached, 2);
        assert_eq!(report.fetched.len(), 3);

        let mut fetched: Vec<String> = fetcher.calls().into_iter().map(|(k, _)| k).collect();
        fetched.sort();
        assert_eq!(fetched, vec!["b.js", "c.png", "d.json"]);
        assert_eq!(ctx.storage.keys(&ctx.namespaces.content).await.unwrap().len(), 5);
        assert!(prefetcher.missing().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_failure_rejects_batch() {
        let fetcher = MockFetcher::new();
        fetcher.serve("b.js", "b");
        fetcher.serve("c.png", "c");
        fetcher.fail("d.json");
        let ctx = seeded(fetcher).await;
        let prefetcher = OfflinePrefetcher::new(ctx.clone());

        let err = prefetcher.prefetch_all().await.unwrap_err();
        assert!(matches!(err, PrecacheError::PrefetchFailed { missing: 3, .. }));
        assert!(err.is_retryable());
        assert_eq!(ctx.storage.keys(&ctx.namespaces.content).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn bad_status_rejects_batch() {
        let fetcher = MockFetcher::new();
        fetcher.serve("b.js", "b");
        fetcher.serve("c.png", "c");
        let ctx = seeded(fetcher).await;

        // d.json is unknown to the mock and answers 404
        let err = OfflinePrefetcher::new(ctx).prefetch_all().await.unwrap_err();
        let PrecacheError::PrefetchFailed { source, .. } = err else {
            panic!("expected prefetch failure");
        };
        assert!(matches!(*source, PrecacheError::BadStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn nothing_missing_is_a_no_op() {
        let fetcher = MockFetcher::new();
        let ctx = testing::context(testing::release(&[("/", "h0")], &[]), fetcher.clone());
        ctx.storage
            .put(&ctx.namespaces.content, &ResourceKey::root(), &Response::ok("<html>"))
            .await
            .unwrap();

        let report = OfflinePrefetcher::new(ctx).prefetch_all().await.unwrap();
        assert!(report.fetched.is_empty());
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn reports_progress() {
        let fetcher = MockFetcher::new();
        for key in ["b.js", "c.png", "d.json"] {
            fetcher.serve(key, key);
        }
        let ctx = seeded(fetcher).await;
        let seen = Mutex::new(vec![]);

        OfflinePrefetcher::new(ctx)
            .prefetch_all_with_progress(&|done, total| seen.lock().unwrap().push((done, total)))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }
}
