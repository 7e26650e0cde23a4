//! Persisted manifest record
//!
//! The record namespace holds a single entry: the manifest the content cache
//! was last made consistent with.

use super::Manifest;
use crate::error::{PrecacheError, PrecacheResult};
use crate::manifest::ResourceKey;
use crate::network::Response;
use crate::storage::CacheStorage;
use std::sync::Arc;
use tracing::debug;

/// Key of the single entry in the record namespace
pub const RECORD_KEY: &str = "manifest";

/// Reads and writes the manifest record
#[derive(Clone)]
pub struct ManifestStore {
    storage: Arc<dyn CacheStorage>,
    namespace: String,
}

impl ManifestStore {
    pub fn new(storage: Arc<dyn CacheStorage>, namespace: impl Into<String>) -> Self {
        Self {
            storage,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn record_key() -> ResourceKey {
        ResourceKey::new(RECORD_KEY)
    }

    /// Load the record; `None` on first run for this cache generation
    pub async fn load(&self) -> PrecacheResult<Option<Manifest>> {
        let Some(entry) = self.storage.get(&self.namespace, &Self::record_key()).await? else {
            return Ok(None);
        };

        let text = std::str::from_utf8(&entry.body)
            .map_err(|e| PrecacheError::RecordCorrupt(e.to_string()))?;
        let manifest =
            Manifest::parse(text).map_err(|e| PrecacheError::RecordCorrupt(e.to_string()))?;

        debug!("Loaded manifest record with {} entries", manifest.len());
        Ok(Some(manifest))
    }

    /// Overwrite the record
    pub async fn save(&self, manifest: &Manifest) -> PrecacheResult<()> {
        let mut response = Response::ok(manifest.to_json()?);
        response.content_type = Some("application/json".to_string());
        self.storage
            .put(&self.namespace, &Self::record_key(), &response)
            .await?;
        debug!("Persisted manifest record with {} entries", manifest.len());
        Ok(())
    }

    /// Drop the record namespace entirely
    pub async fn clear(&self) -> PrecacheResult<bool> {
        self.storage.delete_namespace(&self.namespace).await
    }
}
