//! Install and activate phases of one instance

use super::state::LifecycleState;
use super::wipe_namespaces;
use crate::context::WorkerContext;
use crate::error::{PrecacheError, PrecacheResult};
use crate::manifest::ResourceKey;
use crate::network::{FetchMode, Response};
use crate::storage::CacheNamespace;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

/// Which activation branch ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationMode {
    /// No manifest record existed; content cache rebuilt from staging
    Cold,
    /// Record found; stale entries evicted, the rest kept
    Warm,
}

/// What a successful activation changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub mode: ActivationMode,
    /// Keys removed from the content cache
    pub evicted: Vec<ResourceKey>,
    /// Staged entries copied into the content cache
    pub promoted: usize,
}

/// Result of an activation attempt
///
/// A failed attempt is not an `Err`: the controller recovers by wiping every
/// namespace, and the next activation starts cold.
#[derive(Debug)]
pub enum ActivationOutcome {
    Activated(ActivationReport),
    Reset { cause: PrecacheError },
}

/// Drives one instance through install and activate
pub struct LifecycleController {
    ctx: WorkerContext,
    instance: String,
    staging: String,
    state: watch::Sender<LifecycleState>,
    superseded: watch::Sender<bool>,
    takeover: AtomicBool,
    /// Held for the duration of a phase; install and activate never overlap
    phase: Mutex<()>,
}

impl LifecycleController {
    pub fn new(ctx: WorkerContext, instance: impl Into<String>) -> Self {
        let instance = instance.into();
        let staging = ctx.namespaces.staging_for(&instance);
        Self {
            ctx,
            instance,
            staging,
            state: watch::Sender::new(LifecycleState::Parsed),
            superseded: watch::Sender::new(false),
            takeover: AtomicBool::new(false),
            phase: Mutex::new(()),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Observe state transitions
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Name of this instance's staging namespace
    pub fn staging_namespace(&self) -> &str {
        &self.staging
    }

    /// Whether this instance asked to replace the active one without waiting
    pub fn takeover_requested(&self) -> bool {
        self.takeover.load(Ordering::SeqCst)
    }

    /// Ask to replace the active instance as soon as this one is staged
    pub fn request_takeover(&self) {
        self.takeover.store(true, Ordering::SeqCst);
    }

    fn set_state(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        debug!(instance = %self.instance, "{} -> {}", previous, next);
    }

    fn expect_state(&self, action: &'static str, allowed: &[LifecycleState]) -> PrecacheResult<()> {
        let current = self.state();
        if allowed.contains(&current) {
            Ok(())
        } else {
            Err(PrecacheError::InvalidTransition {
                instance: self.instance.clone(),
                action,
                state: current.to_string(),
            })
        }
    }

    /// Fetch every shell resource, bypassing caches, into staging
    ///
    /// All-or-nothing: on any failure staging is removed and the instance
    /// becomes redundant. Returns the number of staged entries.
    pub async fn install(&self) -> PrecacheResult<usize> {
        let _phase = self.phase.lock().await;
        self.expect_state("install", &[LifecycleState::Parsed])?;
        self.set_state(LifecycleState::Installing);

        match self.stage_shell().await {
            Ok(staged) => {
                self.set_state(LifecycleState::Staged);
                if self.ctx.force_takeover {
                    self.request_takeover();
                }
                info!(instance = %self.instance, "Staged {} shell resource(s)", staged);
                self.ctx
                    .journal
                    .log(
                        "install",
                        &serde_json::json!({"instance": self.instance, "staged": staged}),
                    )
                    .await;
                Ok(staged)
            }
            Err(e) => {
                self.discard_staging().await;
                self.set_state(LifecycleState::Redundant);
                warn!(instance = %self.instance, "Install failed: {}", e);
                self.ctx
                    .journal
                    .log(
                        "install",
                        &serde_json::json!({"instance": self.instance, "error": e.to_string()}),
                    )
                    .await;
                match e {
                    PrecacheError::Superseded => Err(e),
                    other => Err(PrecacheError::InstallFailed(Box::new(other))),
                }
            }
        }
    }

    async fn stage_shell(&self) -> PrecacheResult<usize> {
        let batch = stream::iter(self.ctx.release.shell().iter().cloned())
            .map(|key: ResourceKey| async move { self.fetch_fresh(&key).await })
            .buffered(self.ctx.max_concurrent_fetches)
            .try_collect::<Vec<_>>();

        let entries = tokio::select! {
            result = batch => result?,
            _ = wait_superseded(self.superseded.subscribe()) => {
                return Err(PrecacheError::Superseded);
            }
        };

        // Nothing touches storage until the whole batch is in hand
        if *self.superseded.borrow() {
            return Err(PrecacheError::Superseded);
        }

        let staging = CacheNamespace::open(self.ctx.storage.clone(), &self.staging).await?;
        for (key, response) in &entries {
            staging.put(key, response).await?;
        }
        Ok(entries.len())
    }

    async fn fetch_fresh(&self, key: &ResourceKey) -> PrecacheResult<(ResourceKey, Response)> {
        let url = self.ctx.normalizer.url_for(key)?;
        let response = self.ctx.fetcher.fetch(&url, FetchMode::Reload).await?;
        if !response.is_success() {
            return Err(PrecacheError::BadStatus {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok((key.clone(), response))
    }

    async fn discard_staging(&self) {
        if let Err(e) = self.ctx.storage.delete_namespace(&self.staging).await {
            warn!("Failed to delete staging namespace {}: {}", self.staging, e);
        }
    }

    /// Make the content cache consistent with this release and take over
    ///
    /// Only valid from `Staged`. A failure inside the diff-and-copy sequence
    /// wipes content, staging and the manifest record and leaves the
    /// instance in `Reset`.
    pub async fn activate(&self) -> PrecacheResult<ActivationOutcome> {
        let _phase = self.phase.lock().await;
        self.expect_state("activate", &[LifecycleState::Staged])?;
        self.set_state(LifecycleState::Activating);

        match self.promote().await {
            Ok(report) => {
                // Claim: from here on this instance serves every client
                self.set_state(LifecycleState::Active);
                info!(
                    instance = %self.instance,
                    mode = ?report.mode,
                    evicted = report.evicted.len(),
                    promoted = report.promoted,
                    "Activated"
                );
                self.ctx
                    .journal
                    .log(
                        "activate",
                        &serde_json::json!({"instance": self.instance, "report": report}),
                    )
                    .await;
                Ok(ActivationOutcome::Activated(report))
            }
            Err(cause) => {
                error!(instance = %self.instance, "Activation failed, resetting cache: {}", cause);
                if let Err(e) = wipe_namespaces(self.ctx.storage.as_ref(), &self.ctx.namespaces).await {
                    warn!("Reset incomplete: {}", e);
                }
                self.discard_staging().await;
                self.set_state(LifecycleState::Reset);
                self.ctx
                    .journal
                    .log(
                        "reset",
                        &serde_json::json!({"instance": self.instance, "cause": cause.to_string()}),
                    )
                    .await;
                Ok(ActivationOutcome::Reset { cause })
            }
        }
    }

    async fn promote(&self) -> PrecacheResult<ActivationReport> {
        let storage = self.ctx.storage.clone();
        let namespaces = &self.ctx.namespaces;
        let current = self.ctx.release.manifest();
        let manifest_store = self.ctx.manifest_store();

        let staging = CacheNamespace::open(storage.clone(), &self.staging).await?;
        self.verify_staging(&staging).await?;
        let record = manifest_store.load().await?;

        let (mode, evicted) = match record {
            None => {
                debug!("No manifest record, rebuilding {}", namespaces.content);
                storage.delete_namespace(&namespaces.content).await?;
                (ActivationMode::Cold, Vec::new())
            }
            Some(previous) => {
                let content = CacheNamespace::open(storage.clone(), &namespaces.content).await?;
                let cached = content.keys().await?;
                let stale = current.stale_keys(&previous, cached.iter());
                for key in &stale {
                    content.delete(key).await?;
                    debug!("Evicted {}", key);
                }
                (ActivationMode::Warm, stale)
            }
        };

        let content = CacheNamespace::open(storage.clone(), &namespaces.content).await?;
        let promoted = staging.copy_into(&content).await?;

        manifest_store.save(current).await?;
        storage.delete_namespace(&self.staging).await?;

        Ok(ActivationReport {
            mode,
            evicted,
            promoted,
        })
    }

    /// Every shell key must still be staged before content is touched
    async fn verify_staging(&self, staging: &CacheNamespace) -> PrecacheResult<()> {
        let staged = staging.keys().await?;
        let missing = self
            .ctx
            .release
            .shell()
            .iter()
            .filter(|key| !staged.contains(*key))
            .count();
        if missing > 0 {
            return Err(PrecacheError::StagingIncomplete {
                namespace: self.staging.clone(),
                missing,
            });
        }
        Ok(())
    }

    /// Signal a newer instance replaced this one
    ///
    /// An in-flight install abandons its fetches without writing staging.
    pub fn supersede(&self) {
        self.superseded.send_replace(true);
    }

    /// Supersede and wait for any running phase to settle
    ///
    /// A staged-but-never-activated instance drops its staging namespace.
    pub async fn retire(&self) {
        self.supersede();
        let _phase = self.phase.lock().await;
        match self.state() {
            LifecycleState::Parsed | LifecycleState::Staged => {
                self.discard_staging().await;
                self.set_state(LifecycleState::Redundant);
            }
            LifecycleState::Active => self.set_state(LifecycleState::Redundant),
            _ => {}
        }
    }
}

async fn wait_superseded(mut superseded: watch::Receiver<bool>) {
    loop {
        if *superseded.borrow_and_update() {
            return;
        }
        if superseded.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
