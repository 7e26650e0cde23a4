//! Backend factory
//!
//! Turns a loaded [`Config`] into the storage and fetch backends and the
//! immutable [`WorkerContext`] every instance is built from.

use crate::config::schema::StorageBackend;
use crate::config::{Config, ConfigManager};
use crate::context::WorkerContext;
use crate::error::PrecacheResult;
use crate::journal::Journal;
use crate::manifest::Release;
use crate::network::{Fetcher, HttpFetcher, LocalFetcher};
use crate::request::KeyNormalizer;
use crate::storage::{CacheStorage, DiskStorage, MemoryStorage};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Disk storage root for this configuration
pub fn storage_dir(config: &Config) -> PathBuf {
    config
        .storage
        .dir
        .clone()
        .unwrap_or_else(ConfigManager::store_dir)
}

/// Open the configured storage backend
pub async fn create_storage(config: &Config) -> PrecacheResult<Arc<dyn CacheStorage>> {
    match config.storage.backend {
        StorageBackend::Disk => {
            let dir = storage_dir(config);
            debug!("Opening disk storage at {}", dir.display());
            Ok(Arc::new(DiskStorage::open(dir).await?))
        }
        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
    }
}

/// Network fetcher, or a local directory when `build.source_dir` is set
pub fn create_fetcher(
    config: &Config,
    normalizer: &KeyNormalizer,
) -> PrecacheResult<Arc<dyn Fetcher>> {
    match &config.build.source_dir {
        Some(dir) => Ok(Arc::new(LocalFetcher::new(
            dir.clone(),
            normalizer.base().clone(),
        ))),
        None => Ok(Arc::new(HttpFetcher::new(Duration::from_secs(
            config.origin.timeout_secs,
        ))?)),
    }
}

pub fn create_normalizer(config: &Config) -> PrecacheResult<KeyNormalizer> {
    KeyNormalizer::new(&config.origin.base_url, config.origin.cache_bust_param.clone())
}

pub fn create_journal(config: &Config) -> Journal {
    if !config.general.journal {
        return Journal::disabled();
    }
    Journal::new(
        config
            .general
            .journal_path
            .clone()
            .unwrap_or_else(ConfigManager::journal_path),
    )
}

/// Load the release and wire every backend into one context
pub async fn build_context(config: &Config) -> PrecacheResult<WorkerContext> {
    let release = Release::load(&config.build.manifest, &config.build.shell).await?;
    let storage = create_storage(config).await?;
    build_context_with_storage(config, release, storage)
}

/// Same as [`build_context`] with an already-open storage and loaded release
pub fn build_context_with_storage(
    config: &Config,
    release: Release,
    storage: Arc<dyn CacheStorage>,
) -> PrecacheResult<WorkerContext> {
    let normalizer = create_normalizer(config)?;
    let fetcher = create_fetcher(config, &normalizer)?;
    debug!(
        storage = storage.backend_name(),
        fetcher = fetcher.backend_name(),
        "Backends ready"
    );

    Ok(WorkerContext::new(release, normalizer, storage, fetcher)
        .with_namespaces(config.namespaces.clone())
        .with_journal(create_journal(config))
        .with_max_concurrent_fetches(config.origin.max_concurrent_fetches)
        .with_force_takeover(config.lifecycle.force_takeover))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrecacheError;
    use tempfile::TempDir;

    fn write_build(dir: &std::path::Path) -> Config {
        std::fs::write(
            dir.join("manifest.json"),
            r#"{"/": "h0", "index.html": "h0", "app.js": "h1"}"#,
        )
        .unwrap();
        std::fs::write(dir.join("shell.json"), r#"["index.html"]"#).unwrap();

        let mut config = Config::default();
        config.build.manifest = dir.join("manifest.json");
        config.build.shell = dir.join("shell.json");
        config.build.source_dir = Some(dir.to_path_buf());
        config.storage.dir = Some(dir.join("store"));
        config.general.journal = false;
        config
    }

    #[tokio::test]
    async fn builds_context_from_config() {
        let temp = TempDir::new().unwrap();
        let mut config = write_build(temp.path());
        config.origin.max_concurrent_fetches = 3;
        config.lifecycle.force_takeover = false;

        let ctx = build_context(&config).await.unwrap();
        assert_eq!(ctx.release.manifest().len(), 3);
        assert_eq!(ctx.max_concurrent_fetches, 3);
        assert!(!ctx.force_takeover);
        assert_eq!(ctx.storage.backend_name(), "disk");
        assert_eq!(ctx.fetcher.backend_name(), "local");
        assert!(temp.path().join("store").is_dir());
    }

    #[tokio::test]
    async fn memory_backend_and_http_fetcher() {
        let temp = TempDir::new().unwrap();
        let mut config = write_build(temp.path());
        config.storage.backend = StorageBackend::Memory;
        config.build.source_dir = None;

        let ctx = build_context(&config).await.unwrap();
        assert_eq!(ctx.storage.backend_name(), "memory");
        assert_eq!(ctx.fetcher.backend_name(), "http");
    }

    #[tokio::test]
    async fn missing_build_output_fails() {
        let temp = TempDir::new().unwrap();
        let mut config = write_build(temp.path());
        config.build.manifest = temp.path().join("missing.json");

        let err = build_context(&config).await.err().unwrap();
        assert!(matches!(err, PrecacheError::Io { .. } | PrecacheError::ManifestInvalid { .. }));
    }
}
