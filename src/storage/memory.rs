//! In-process namespace store

use super::{check_namespace, CacheStorage};
use crate::error::PrecacheResult;
use crate::manifest::ResourceKey;
use crate::network::Response;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

type Namespace = BTreeMap<ResourceKey, Response>;

/// Volatile storage backed by maps; contents die with the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    namespaces: RwLock<BTreeMap<String, Namespace>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn create_namespace(&self, namespace: &str) -> PrecacheResult<()> {
        check_namespace(namespace)?;
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default();
        Ok(())
    }

    async fn has_namespace(&self, namespace: &str) -> PrecacheResult<bool> {
        Ok(self.namespaces.read().await.contains_key(namespace))
    }

    async fn delete_namespace(&self, namespace: &str) -> PrecacheResult<bool> {
        Ok(self.namespaces.write().await.remove(namespace).is_some())
    }

    async fn namespaces(&self) -> PrecacheResult<Vec<String>> {
        Ok(self.namespaces.read().await.keys().cloned().collect())
    }

    async fn keys(&self, namespace: &str) -> PrecacheResult<Vec<ResourceKey>> {
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, namespace: &str, key: &ResourceKey) -> PrecacheResult<Option<Response>> {
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .and_then(|ns| ns.get(key).cloned()))
    }

    async fn put(
        &self,
        namespace: &str,
        key: &ResourceKey,
        response: &Response,
    ) -> PrecacheResult<()> {
        check_namespace(namespace)?;
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .insert(key.clone(), response.clone());
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &ResourceKey) -> PrecacheResult<bool> {
        Ok(self
            .namespaces
            .write()
            .await
            .get_mut(namespace)
            .is_some_and(|ns| ns.remove(key).is_some()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_namespace_reads_empty() {
        let storage = MemoryStorage::new();
        assert!(!storage.has_namespace("content").await.unwrap());
        assert!(storage.keys("content").await.unwrap().is_empty());
        assert!(storage
            .get("content", &ResourceKey::root())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn put_creates_namespace() {
        let storage = MemoryStorage::new();
        storage
            .put("content", &ResourceKey::root(), &Response::ok("<html>"))
            .await
            .unwrap();
        assert!(storage.has_namespace("content").await.unwrap());
        assert_eq!(storage.namespaces().await.unwrap(), vec!["content".to_string()]);
    }

    #[tokio::test]
    async fn delete_namespace_drops_entries() {
        let storage = MemoryStorage::new();
        let key = ResourceKey::new("main.js");
        storage.put("content", &key, &Response::ok("js")).await.unwrap();

        assert!(storage.delete_namespace("content").await.unwrap());
        assert!(!storage.delete_namespace("content").await.unwrap());
        assert!(storage.get("content", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_entry() {
        let storage = MemoryStorage::new();
        let key = ResourceKey::new("main.js");
        storage.put("content", &key, &Response::ok("js")).await.unwrap();

        assert!(storage.delete("content", &key).await.unwrap());
        assert!(!storage.delete("content", &key).await.unwrap());
        assert!(!storage.delete("other", &key).await.unwrap());
    }
}
