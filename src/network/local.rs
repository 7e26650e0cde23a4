//! Fetcher serving a local build output directory
//!
//! Useful for populating a cache from a build tree without a web server.
//! Paths are resolved relative to the configured base URL; the base itself
//! serves `index.html`.

use super::{FetchMode, Fetcher, Response};
use crate::error::{PrecacheError, PrecacheResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use url::Url;

const INDEX_DOCUMENT: &str = "index.html";

/// Serves files below `root` as if they were hosted at `base`
#[derive(Debug, Clone)]
pub struct LocalFetcher {
    root: PathBuf,
    base: Url,
}

impl LocalFetcher {
    pub fn new(root: impl Into<PathBuf>, base: Url) -> Self {
        Self {
            root: root.into(),
            base,
        }
    }

    /// Map a URL to a file below the root, or `None` if it is outside it
    fn resolve(&self, url: &Url) -> Option<PathBuf> {
        if url.origin() != self.base.origin() {
            return None;
        }
        let relative = url.path().strip_prefix(self.base.path())?;
        let relative = if relative.is_empty() {
            INDEX_DOCUMENT
        } else {
            relative
        };

        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    let mime = match ext {
        "html" => "text/html",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "css" => "text/css",
        "wasm" => "application/wasm",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        "otf" => "font/otf",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    };
    Some(mime)
}

#[async_trait]
impl Fetcher for LocalFetcher {
    async fn fetch(&self, url: &Url, _mode: FetchMode) -> PrecacheResult<Response> {
        let Some(path) = self.resolve(url) else {
            return Ok(Response::with_status(404, Vec::new()));
        };

        match tokio::fs::read(&path).await {
            Ok(body) => Ok(Response {
                status: 200,
                content_type: content_type_for(&path).map(str::to_string),
                body,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Response::with_status(404, Vec::new())),
            Err(e) => Err(PrecacheError::fetch_failed(url.as_str(), e.to_string())),
        }
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
