//! Configuration schema for precache
//!
//! Configuration is stored at `~/.config/precache/config.toml`

use crate::context::{Namespaces, DEFAULT_MAX_CONCURRENT_FETCHES};
use crate::request::DEFAULT_BUST_PARAM;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Where resources are fetched from
    pub origin: OriginConfig,

    /// Build outputs describing the release
    pub build: BuildConfig,

    /// Cache storage backend
    pub storage: StorageConfig,

    /// Namespace names
    pub namespaces: Namespaces,

    /// Lifecycle behaviour
    pub lifecycle: LifecycleConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Record install/activate/reset events in the journal
    pub journal: bool,

    /// Journal location (defaults to the state directory)
    pub journal_path: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            journal: true,
            journal_path: None,
        }
    }
}

/// Origin the manifest keys are resolved against
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Base URL; the root key maps to this path
    pub base_url: String,

    /// Query parameter stripped during key normalization
    pub cache_bust_param: String,

    /// Per-request timeout for network fetches
    pub timeout_secs: u64,

    /// Fetches in flight per batch
    pub max_concurrent_fetches: usize,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            cache_bust_param: DEFAULT_BUST_PARAM.to_string(),
            timeout_secs: 30,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

/// Build-time outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Manifest document: key -> fingerprint
    pub manifest: PathBuf,

    /// Shell resource list: ordered keys
    pub shell: PathBuf,

    /// Serve resources from this directory instead of the network
    pub source_dir: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from("dist/precache-manifest.json"),
            shell: PathBuf::from("dist/precache-shell.json"),
            source_dir: None,
        }
    }
}

/// Storage backend kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Disk,
    Memory,
}

/// Cache storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Storage root for the disk backend (defaults to the state directory)
    pub dir: Option<PathBuf>,
}

/// Lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Replace the active instance as soon as a new one is staged
    pub force_takeover: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            force_takeover: true,
        }
    }
}

impl Config {
    /// Check values serde cannot, returning the first problem found
    pub fn problems(&self) -> Option<String> {
        if let Err(e) = url::Url::parse(&self.origin.base_url) {
            return Some(format!("origin.base_url '{}': {}", self.origin.base_url, e));
        }
        if self.origin.max_concurrent_fetches == 0 {
            return Some("origin.max_concurrent_fetches must be at least 1".to_string());
        }
        if self.origin.cache_bust_param.is_empty() {
            return Some("origin.cache_bust_param must not be empty".to_string());
        }
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Some(format!(
                "general.log_format must be \"text\" or \"json\", got '{}'",
                self.general.log_format
            ));
        }

        let ns = &self.namespaces;
        if ns.content == ns.manifest
            || ns.is_staging(&ns.content)
            || ns.is_staging(&ns.manifest)
        {
            return Some("namespaces.content, staging and manifest must be distinct".to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[origin]"));
        assert!(toml.contains("[namespaces]"));
        assert!(toml.contains("backend = \"disk\""));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.origin.cache_bust_param, "v");
        assert_eq!(config.namespaces.content, "precache-content");
        assert!(config.lifecycle.force_takeover);
        assert!(config.problems().is_none());
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [origin]
            base_url = "https://app.example.com/pwa/"

            [storage]
            backend = "memory"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.origin.base_url, "https://app.example.com/pwa/");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.origin.timeout_secs, 30); // default preserved
    }

    #[test]
    fn problems_reported() {
        let mut config = Config::default();
        config.origin.base_url = "not a url".to_string();
        assert!(config.problems().unwrap().contains("base_url"));

        let mut config = Config::default();
        config.namespaces.manifest = config.namespaces.content.clone();
        assert!(config.problems().is_some());

        let mut config = Config::default();
        config.general.log_format = "xml".to_string();
        assert!(config.problems().is_some());
    }
}
