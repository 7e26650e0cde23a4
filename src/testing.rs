//! Test doubles shared by unit tests

use crate::context::WorkerContext;
use crate::error::{PrecacheError, PrecacheResult};
use crate::manifest::{Manifest, Release, ShellSet};
use crate::network::{FetchMode, Fetcher, Response};
use crate::request::KeyNormalizer;
use crate::storage::{CacheStorage, MemoryStorage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

pub const BASE: &str = "https://app.test/";

enum Outcome {
    Respond(Response),
    Fail,
    Stall,
}

/// Fetcher answering from a table keyed by resource key and counting calls
///
/// Unknown keys answer 404.
#[derive(Default)]
pub struct MockFetcher {
    outcomes: Mutex<HashMap<String, Outcome>>,
    calls: Mutex<Vec<(String, FetchMode)>>,
}

impl MockFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn set(&self, key: &str, outcome: Outcome) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(key.to_string(), outcome);
    }

    /// Serve `body` with status 200
    pub fn serve(&self, key: &str, body: &str) {
        self.set(key, Outcome::Respond(Response::ok(body)));
    }

    pub fn serve_status(&self, key: &str, status: u16) {
        self.set(key, Outcome::Respond(Response::with_status(status, "error")));
    }

    /// Fail the transport for `key`
    pub fn fail(&self, key: &str) {
        self.set(key, Outcome::Fail);
    }

    /// Never answer for `key`
    pub fn stall(&self, key: &str) {
        self.set(key, Outcome::Stall);
    }

    pub fn calls(&self) -> Vec<(String, FetchMode)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, key: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == key)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn key_of(url: &Url) -> String {
        match url.path() {
            "/" => "/".to_string(),
            path => path.trim_start_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &Url, mode: FetchMode) -> PrecacheResult<Response> {
        let key = Self::key_of(url);
        self.calls.lock().unwrap().push((key.clone(), mode));

        let result = match self.outcomes.lock().unwrap().get(&key) {
            Some(Outcome::Respond(response)) => Some(Ok(response.clone())),
            Some(Outcome::Fail) => Some(Err(PrecacheError::fetch_failed(
                url.as_str(),
                "connection refused",
            ))),
            Some(Outcome::Stall) => None,
            None => Some(Ok(Response::with_status(404, ""))),
        };

        match result {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

pub fn release(pairs: &[(&str, &str)], shell: &[&str]) -> Release {
    let manifest = Manifest::from_pairs(pairs.iter().copied());
    Release::new(manifest, ShellSet::new(shell.iter().copied())).unwrap()
}

/// Context over fresh in-memory storage
pub fn context(release: Release, fetcher: Arc<MockFetcher>) -> WorkerContext {
    let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::new());
    context_with_storage(release, fetcher, storage)
}

pub fn context_with_storage(
    release: Release,
    fetcher: Arc<MockFetcher>,
    storage: Arc<dyn CacheStorage>,
) -> WorkerContext {
    let normalizer = KeyNormalizer::new(BASE, "v").unwrap();
    WorkerContext::new(release, normalizer, storage, fetcher)
}
