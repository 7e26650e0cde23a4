//! Lifecycle journal
//!
//! Writes JSON lines to `<state dir>/journal.log` for every install,
//! activation and reset, so a user can tell after the fact why a cache was
//! rebuilt from scratch.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// File-based journal that appends JSON lines
#[derive(Debug, Clone)]
pub struct Journal {
    path: Option<PathBuf>,
}

impl Journal {
    /// Journal appending to `path`
    pub fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Journal that drops every event
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Record an event as a JSON line
    ///
    /// Drops events on IO failure; journaling never fails a lifecycle phase.
    pub async fn log(&self, event: &str, data: &serde_json::Value) {
        let Some(path) = &self.path else {
            return;
        };

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize journal event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = append(path, &line).await {
            warn!("Failed to write journal {}: {}", path.display(), e);
        }
    }
}

async fn append(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_json_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.log");
        let journal = Journal::new(path.clone());

        journal
            .log("activate", &serde_json::json!({"mode": "cold", "promoted": 2}))
            .await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();

        assert_eq!(parsed["event"], "activate");
        assert_eq!(parsed["data"]["promoted"], 2);
        assert!(parsed["timestamp"].is_string());
    }

    #[tokio::test]
    async fn appends_multiple_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("journal.log");
        let journal = Journal::new(path.clone());

        journal.log("install", &serde_json::json!({})).await;
        journal.log("activate", &serde_json::json!({})).await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.trim().lines().count(), 2);
    }

    #[tokio::test]
    async fn disabled_writes_nothing() {
        let dir = TempDir::new().unwrap();
        Journal::disabled()
            .log("reset", &serde_json::json!({}))
            .await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
