//! On-disk namespace store
//!
//! Layout: one directory per namespace under the storage root. Each entry is
//! a pair of files named after the SHA256 of its key:
//!
//! - `<hash>.body` holds the raw response bytes
//! - `<hash>.json` holds the key, status and content type
//!
//! Both files are written to temporaries and renamed into place, body first.
//! The metadata file is removed first on delete, so its presence is what
//! makes an entry visible. Entries whose metadata no longer parses are
//! removed the next time the namespace is listed.

use super::{check_namespace, CacheStorage};
use crate::error::{PrecacheError, PrecacheResult};
use crate::manifest::ResourceKey;
use crate::network::Response;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const META_EXT: &str = "json";
const BODY_EXT: &str = "body";
const TEMP_EXT: &str = "tmp";

/// Entry metadata persisted next to the body
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    key: ResourceKey,
    status: u16,
    content_type: Option<String>,
    stored_at: DateTime<Utc>,
}

/// Persistent storage rooted at a directory
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Create the storage, ensuring the root directory exists
    pub async fn open(root: impl Into<PathBuf>) -> PrecacheResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| PrecacheError::io(format!("creating storage root {}", root.display()), e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> PrecacheResult<PathBuf> {
        check_namespace(namespace)?;
        Ok(self.root.join(namespace))
    }

    fn entry_stem(key: &ResourceKey) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_str().as_bytes());
        hex::encode(hasher.finalize())
    }

    fn entry_paths(dir: &Path, key: &ResourceKey) -> (PathBuf, PathBuf) {
        let stem = Self::entry_stem(key);
        (
            dir.join(format!("{}.{}", stem, META_EXT)),
            dir.join(format!("{}.{}", stem, BODY_EXT)),
        )
    }

    async fn read_meta(namespace: &str, path: &Path) -> PrecacheResult<Option<EntryMeta>> {
        let content = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PrecacheError::io(
                    format!("reading entry metadata {}", path.display()),
                    e,
                ))
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| PrecacheError::EntryCorrupt {
                namespace: namespace.to_string(),
                key: path.display().to_string(),
                reason: e.to_string(),
            })
    }
}

/// Unique temporary path next to `path`; never listed as an entry
fn temp_path(path: &Path) -> PathBuf {
    path.with_extension(format!("{}.{}", Uuid::new_v4().simple(), TEMP_EXT))
}

/// Write to a temporary file, then rename it over `path`
async fn write_replace(path: &Path, contents: &[u8]) -> PrecacheResult<()> {
    let temp = temp_path(path);
    if let Err(e) = fs::write(&temp, contents).await {
        let _ = fs::remove_file(&temp).await;
        return Err(PrecacheError::io(format!("writing {}", temp.display()), e));
    }
    if let Err(e) = fs::rename(&temp, path).await {
        let _ = fs::remove_file(&temp).await;
        return Err(PrecacheError::io(format!("replacing {}", path.display()), e));
    }
    Ok(())
}

/// Remove a file, treating "already gone" as success. Returns whether it existed.
async fn remove_if_exists(path: &Path) -> PrecacheResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(PrecacheError::io(format!("deleting {}", path.display()), e)),
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn create_namespace(&self, namespace: &str) -> PrecacheResult<()> {
        let dir = self.namespace_dir(namespace)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| PrecacheError::io(format!("creating namespace {}", dir.display()), e))
    }

    async fn has_namespace(&self, namespace: &str) -> PrecacheResult<bool> {
        Ok(self.namespace_dir(namespace)?.is_dir())
    }

    async fn delete_namespace(&self, namespace: &str) -> PrecacheResult<bool> {
        let dir = self.namespace_dir(namespace)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Deleted namespace {}", namespace);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PrecacheError::io(
                format!("deleting namespace {}", dir.display()),
                e,
            )),
        }
    }

    async fn namespaces(&self) -> PrecacheResult<Vec<String>> {
        let mut names = vec![];
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| PrecacheError::io("reading storage root", e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PrecacheError::io("reading storage root entry", e))?
        {
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    async fn keys(&self, namespace: &str) -> PrecacheResult<Vec<ResourceKey>> {
        let dir = self.namespace_dir(namespace)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(PrecacheError::io(
                    format!("reading namespace {}", dir.display()),
                    e,
                ))
            }
        };

        let mut keys = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PrecacheError::io("reading namespace entry", e))?
        {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == META_EXT) {
                continue;
            }
            match Self::read_meta(namespace, &path).await {
                Ok(Some(meta)) => keys.push(meta.key),
                Ok(None) => {}
                Err(e @ PrecacheError::EntryCorrupt { .. }) => {
                    warn!("Removing corrupt entry {}: {}", path.display(), e);
                    remove_if_exists(&path).await?;
                    remove_if_exists(&path.with_extension(BODY_EXT)).await?;
                }
                Err(e) => warn!("Skipping unreadable entry {}: {}", path.display(), e),
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn get(&self, namespace: &str, key: &ResourceKey) -> PrecacheResult<Option<Response>> {
        let dir = self.namespace_dir(namespace)?;
        let (meta_path, body_path) = Self::entry_paths(&dir, key);

        let Some(meta) = Self::read_meta(namespace, &meta_path).await? else {
            return Ok(None);
        };

        let body = match fs::read(&body_path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PrecacheError::EntryCorrupt {
                    namespace: namespace.to_string(),
                    key: key.to_string(),
                    reason: "body file missing".to_string(),
                })
            }
            Err(e) => {
                return Err(PrecacheError::io(
                    format!("reading entry body {}", body_path.display()),
                    e,
                ))
            }
        };

        Ok(Some(Response {
            status: meta.status,
            content_type: meta.content_type,
            body,
        }))
    }

    async fn put(
        &self,
        namespace: &str,
        key: &ResourceKey,
        response: &Response,
    ) -> PrecacheResult<()> {
        self.create_namespace(namespace).await?;
        let dir = self.namespace_dir(namespace)?;
        let (meta_path, body_path) = Self::entry_paths(&dir, key);

        let meta = EntryMeta {
            key: key.clone(),
            status: response.status,
            content_type: response.content_type.clone(),
            stored_at: Utc::now(),
        };
        let meta_json = serde_json::to_string(&meta)?;

        write_replace(&body_path, &response.body).await?;
        write_replace(&meta_path, meta_json.as_bytes()).await?;
        debug!("Stored {} in {}", key, namespace);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &ResourceKey) -> PrecacheResult<bool> {
        let dir = self.namespace_dir(namespace)?;
        let (meta_path, body_path) = Self::entry_paths(&dir, key);

        let existed = remove_if_exists(&meta_path).await?;
        remove_if_exists(&body_path).await?;
        Ok(existed)
    }

    fn backend_name(&self) -> &'static str {
        "disk"
    }
}
