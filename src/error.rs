//! Error types for precache
//!
//! All modules use `PrecacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for precache operations
pub type PrecacheResult<T> = Result<T, PrecacheError>;

/// All errors that can occur in precache
#[derive(Error, Debug)]
pub enum PrecacheError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Build artifact errors
    #[error("Invalid manifest {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("Manifest has no entry for the root document key \"/\"")]
    RootKeyMissing,

    #[error("Shell resource {0} is not listed in the manifest")]
    ShellKeyNotInManifest(String),

    #[error("Persisted manifest record is corrupt: {0}")]
    RecordCorrupt(String),

    // Network errors
    #[error("Network request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Fetch of {url} failed: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Fetch of {url} returned status {status}")]
    BadStatus { url: String, status: u16 },

    // Lifecycle errors
    #[error("Install failed: {0}")]
    InstallFailed(#[source] Box<PrecacheError>),

    #[error("Install abandoned: instance was superseded by a newer one")]
    Superseded,

    #[error("Prefetch of {missing} resource(s) failed: {source}")]
    PrefetchFailed {
        missing: usize,
        #[source]
        source: Box<PrecacheError>,
    },

    #[error("Staging namespace {namespace} is missing {missing} shell resource(s)")]
    StagingIncomplete { namespace: String, missing: usize },

    #[error("Instance {instance} cannot {action} while {state}")]
    InvalidTransition {
        instance: String,
        action: &'static str,
        state: String,
    },

    // Storage errors
    #[error("Invalid namespace name: {0}")]
    NamespaceInvalid(String),

    #[error("Cache entry {key} in {namespace} is corrupt: {reason}")]
    EntryCorrupt {
        namespace: String,
        key: String,
        reason: String,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl PrecacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network error for a URL
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Create a generic fetch failure
    pub fn fetch_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FetchFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error came from the transport rather than local state
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::FetchFailed { .. } | Self::BadStatus { .. }
        )
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InstallFailed(inner) | Self::PrefetchFailed { source: inner, .. } => {
                inner.is_network() || inner.is_retryable()
            }
            Self::Network { .. } | Self::FetchFailed { .. } | Self::Superseded => true,
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigInvalid { .. } => Some("Check the file, or run: precache config init --force"),
            Self::ManifestInvalid { .. } | Self::RootKeyMissing | Self::ShellKeyNotInManifest(_) => {
                Some("Regenerate the build artifacts referenced by [build] in the config")
            }
            Self::RecordCorrupt(_) => Some("Run: precache reset"),
            Self::PrefetchFailed { .. } => Some("Nothing was stored; re-run: precache prefetch"),
            Self::InstallFailed(_) => Some("The previous cache is still in use; retry: precache upgrade"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PrecacheError::ShellKeyNotInManifest("main.js".to_string());
        assert!(err.to_string().contains("main.js"));
    }

    #[test]
    fn error_hint() {
        let err = PrecacheError::RecordCorrupt("eof".to_string());
        assert_eq!(err.hint(), Some("Run: precache reset"));
        assert!(PrecacheError::Superseded.hint().is_none());
    }

    #[test]
    fn error_retryable() {
        let install = PrecacheError::InstallFailed(Box::new(PrecacheError::fetch_failed(
            "https://app.test/main.js",
            "connection refused",
        )));
        assert!(install.is_retryable());
        assert!(!PrecacheError::RootKeyMissing.is_retryable());
    }
}
