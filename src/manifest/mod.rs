//! Build manifest model
//!
//! A manifest maps every resource key the application may request to the
//! content fingerprint of that build. The shell set lists the keys that must
//! be fetched fresh before a new build can serve traffic.
//!
//! Both artifacts are produced at build time and loaded here read-only.

mod store;

pub use store::{ManifestStore, RECORD_KEY};

use crate::error::{PrecacheError, PrecacheResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Normalized path identifying a cacheable resource
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Reserved key for the root document
    pub const ROOT: &'static str = "/";

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The reserved root document key
    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Opaque content hash; equal fingerprints mean identical bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resource key to fingerprint mapping for one build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(BTreeMap<ResourceKey, Fingerprint>);

impl Manifest {
    /// Build a manifest from `(key, fingerprint)` pairs
    pub fn from_pairs<K, F>(pairs: impl IntoIterator<Item = (K, F)>) -> Self
    where
        K: Into<String>,
        F: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, f)| (ResourceKey::new(k), Fingerprint::new(f)))
                .collect(),
        )
    }

    /// Parse a manifest from its JSON document (flat object of strings)
    pub fn parse(content: &str) -> PrecacheResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Serialize to the JSON document form
    pub fn to_json(&self) -> PrecacheResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn fingerprint(&self, key: &ResourceKey) -> Option<&Fingerprint> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a cached copy of `key` built from `previous` is still valid
    /// under this manifest.
    ///
    /// A key survives only if it is still listed and its fingerprint is the
    /// same in both generations. Keys the previous record never listed are
    /// treated as stale.
    pub fn retains(&self, previous: &Manifest, key: &ResourceKey) -> bool {
        match (self.fingerprint(key), previous.fingerprint(key)) {
            (Some(current), Some(recorded)) => current == recorded,
            _ => false,
        }
    }

    /// Keys among `cached` that must be evicted when moving from `previous`
    /// to this manifest.
    pub fn stale_keys<'a>(
        &self,
        previous: &Manifest,
        cached: impl IntoIterator<Item = &'a ResourceKey>,
    ) -> Vec<ResourceKey> {
        cached
            .into_iter()
            .filter(|key| !self.retains(previous, key))
            .cloned()
            .collect()
    }
}

/// Ordered list of keys fetched cache-bypassing during install
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShellSet(Vec<ResourceKey>);

impl ShellSet {
    pub fn new<K: Into<String>>(keys: impl IntoIterator<Item = K>) -> Self {
        Self(keys.into_iter().map(ResourceKey::new).collect())
    }

    pub fn parse(content: &str) -> PrecacheResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceKey> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The build artifacts one instance is constructed with
#[derive(Debug, Clone)]
pub struct Release {
    manifest: Manifest,
    shell: ShellSet,
}

impl Release {
    /// Validate and bundle a manifest with its shell set
    ///
    /// The root key must be listed and every shell key must be a manifest key.
    pub fn new(manifest: Manifest, shell: ShellSet) -> PrecacheResult<Self> {
        if !manifest.contains(&ResourceKey::root()) {
            return Err(PrecacheError::RootKeyMissing);
        }
        if let Some(key) = shell.iter().find(|k| !manifest.contains(k)) {
            return Err(PrecacheError::ShellKeyNotInManifest(key.to_string()));
        }
        Ok(Self { manifest, shell })
    }

    /// Load both artifacts from JSON files
    pub async fn load(manifest_path: &Path, shell_path: &Path) -> PrecacheResult<Self> {
        let manifest = read_artifact(manifest_path, Manifest::parse).await?;
        let shell = read_artifact(shell_path, ShellSet::parse).await?;
        Self::new(manifest, shell)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn shell(&self) -> &ShellSet {
        &self.shell
    }
}

async fn read_artifact<T>(
    path: &Path,
    parse: impl FnOnce(&str) -> PrecacheResult<T>,
) -> PrecacheResult<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PrecacheError::io(format!("reading {}", path.display()), e))?;

    parse(&content).map_err(|e| PrecacheError::ManifestInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
