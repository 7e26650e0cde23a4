//! Immutable per-instance configuration
//!
//! Everything a worker instance needs is bundled here and handed to its
//! constructor: the release it serves, namespace names, key normalization
//! and the storage/network backends.

use crate::journal::Journal;
use crate::manifest::{ManifestStore, Release};
use crate::network::Fetcher;
use crate::request::KeyNormalizer;
use crate::storage::CacheStorage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default number of resource fetches in flight per batch
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// Names of the persisted namespaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Namespaces {
    /// Authoritative resource store, survives upgrades
    pub content: String,

    /// Prefix of the per-instance staging namespaces
    pub staging: String,

    /// Namespace holding the manifest record
    pub manifest: String,
}

impl Default for Namespaces {
    fn default() -> Self {
        Self {
            content: "precache-content".to_string(),
            staging: "precache-staging".to_string(),
            manifest: "precache-manifest".to_string(),
        }
    }
}

impl Namespaces {
    /// Staging namespace owned by one instance
    pub fn staging_for(&self, instance: &str) -> String {
        format!("{}-{}", self.staging, instance)
    }

    /// Whether `name` is some instance's staging namespace
    pub fn is_staging(&self, name: &str) -> bool {
        name.strip_prefix(self.staging.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    }
}

/// Shared, read-only context of one worker instance
#[derive(Clone)]
pub struct WorkerContext {
    pub release: Arc<Release>,
    pub namespaces: Arc<Namespaces>,
    pub normalizer: Arc<KeyNormalizer>,
    pub storage: Arc<dyn CacheStorage>,
    pub fetcher: Arc<dyn Fetcher>,
    pub journal: Journal,
    pub max_concurrent_fetches: usize,
    pub force_takeover: bool,
}

impl WorkerContext {
    /// Context with default namespaces, no journal and forced takeover
    pub fn new(
        release: Release,
        normalizer: KeyNormalizer,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            release: Arc::new(release),
            namespaces: Arc::new(Namespaces::default()),
            normalizer: Arc::new(normalizer),
            storage,
            fetcher,
            journal: Journal::disabled(),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            force_takeover: true,
        }
    }

    pub fn with_namespaces(mut self, namespaces: Namespaces) -> Self {
        self.namespaces = Arc::new(namespaces);
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit.max(1);
        self
    }

    pub fn with_force_takeover(mut self, force: bool) -> Self {
        self.force_takeover = force;
        self
    }

    /// Same backends and settings, serving a different release
    pub fn for_release(&self, release: Release) -> Self {
        Self {
            release: Arc::new(release),
            ..self.clone()
        }
    }

    pub fn manifest_store(&self) -> ManifestStore {
        ManifestStore::new(self.storage.clone(), self.namespaces.manifest.clone())
    }
}
