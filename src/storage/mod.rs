//! Named cache namespaces
//!
//! Every namespace is a flat key -> response map. The lifecycle controller
//! works with three of them: the long-lived content cache, a per-instance
//! staging cache and the manifest record.
//!
//! Backends implement [`CacheStorage`]; callers normally go through
//! [`CacheNamespace`], which binds a backend to one namespace name.

mod disk;
mod memory;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;

use crate::error::{PrecacheError, PrecacheResult};
use crate::manifest::ResourceKey;
use crate::network::Response;
use async_trait::async_trait;
use std::sync::Arc;

/// Abstract namespace store
///
/// Writes to a namespace that does not exist create it. Reads from a missing
/// namespace behave as reads from an empty one.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the namespace if it does not exist yet
    async fn create_namespace(&self, namespace: &str) -> PrecacheResult<()>;

    /// Check whether the namespace exists
    async fn has_namespace(&self, namespace: &str) -> PrecacheResult<bool>;

    /// Delete the namespace and every entry in it. Returns whether it existed.
    async fn delete_namespace(&self, namespace: &str) -> PrecacheResult<bool>;

    /// List existing namespace names
    async fn namespaces(&self) -> PrecacheResult<Vec<String>>;

    /// List keys stored in a namespace
    async fn keys(&self, namespace: &str) -> PrecacheResult<Vec<ResourceKey>>;

    /// Look up one entry
    async fn get(&self, namespace: &str, key: &ResourceKey) -> PrecacheResult<Option<Response>>;

    /// Store an entry, replacing any previous one for the key
    async fn put(&self, namespace: &str, key: &ResourceKey, response: &Response)
        -> PrecacheResult<()>;

    /// Remove one entry. Returns whether it existed.
    async fn delete(&self, namespace: &str, key: &ResourceKey) -> PrecacheResult<bool>;

    /// Human-readable backend name for display
    fn backend_name(&self) -> &'static str;
}

/// Validate a namespace name before it is used as a directory or map key
pub(crate) fn check_namespace(name: &str) -> PrecacheResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && name != "."
        && name != "..";

    if valid {
        Ok(())
    } else {
        Err(PrecacheError::NamespaceInvalid(name.to_string()))
    }
}

/// A backend bound to one namespace
#[derive(Clone)]
pub struct CacheNamespace {
    storage: Arc<dyn CacheStorage>,
    name: String,
}

impl CacheNamespace {
    /// Open (creating if needed) a namespace
    pub async fn open(storage: Arc<dyn CacheStorage>, name: &str) -> PrecacheResult<Self> {
        storage.create_namespace(name).await?;
        Ok(Self {
            storage,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn keys(&self) -> PrecacheResult<Vec<ResourceKey>> {
        self.storage.keys(&self.name).await
    }

    pub async fn get(&self, key: &ResourceKey) -> PrecacheResult<Option<Response>> {
        self.storage.get(&self.name, key).await
    }

    pub async fn put(&self, key: &ResourceKey, response: &Response) -> PrecacheResult<()> {
        self.storage.put(&self.name, key, response).await
    }

    pub async fn delete(&self, key: &ResourceKey) -> PrecacheResult<bool> {
        self.storage.delete(&self.name, key).await
    }

    /// Copy every entry of `self` into `target`, overwriting
    pub async fn copy_into(&self, target: &CacheNamespace) -> PrecacheResult<usize> {
        let mut copied = 0;
        for key in self.keys().await? {
            if let Some(response) = self.get(&key).await? {
                target.put(&key, &response).await?;
                copied += 1;
            }
        }
        Ok(copied)
    }
}
