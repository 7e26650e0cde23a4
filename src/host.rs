//! Hosting side of the worker lifecycle
//!
//! A [`Registration`] tracks up to three instances: the one installing, the
//! one staged and waiting, and the one serving requests. A newer instance
//! supersedes an older one in the same slot.

use crate::error::PrecacheResult;
use crate::intercept::FetchOutcome;
use crate::lifecycle::ActivationOutcome;
use crate::prefetch::PrefetchReport;
use crate::request::Request;
use crate::worker::{Command, EventOutcome, Worker, WorkerEvent};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Default)]
struct Slots {
    installing: Option<Arc<Worker>>,
    waiting: Option<Arc<Worker>>,
    active: Option<Arc<Worker>>,
}

/// What an update did
#[derive(Debug)]
pub enum UpdateOutcome {
    /// Staged; waiting for the active instance to be released
    Waiting { staged: usize },
    /// Staged and promoted
    Promoted {
        staged: usize,
        activation: ActivationOutcome,
    },
}

#[derive(Default)]
pub struct Registration {
    slots: Mutex<Slots>,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn active(&self) -> Option<Arc<Worker>> {
        self.slots.lock().await.active.clone()
    }

    pub async fn waiting(&self) -> Option<Arc<Worker>> {
        self.slots.lock().await.waiting.clone()
    }

    /// Install a new instance and promote it when nothing blocks it
    ///
    /// An instance still installing is superseded. Promotion happens when no
    /// instance is active or the new one requested a takeover.
    pub async fn update(&self, worker: Arc<Worker>) -> PrecacheResult<UpdateOutcome> {
        let previous = self.slots.lock().await.installing.replace(worker.clone());
        if let Some(previous) = previous {
            debug!(worker = %previous.id(), "Superseding in-progress install");
            previous.lifecycle().supersede();
        }

        let installed = worker.dispatch(WorkerEvent::Install).await;

        let replaced = {
            let mut slots = self.slots.lock().await;
            if slots
                .installing
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &worker))
            {
                slots.installing = None;
            }
            match &installed {
                Ok(_) => slots.waiting.replace(worker.clone()),
                Err(_) => None,
            }
        };
        if let Some(replaced) = replaced {
            replaced.lifecycle().retire().await;
        }

        let staged = match installed? {
            EventOutcome::Installed { staged } => staged,
            _ => 0,
        };

        let promote = worker.lifecycle().takeover_requested() || self.active().await.is_none();
        if !promote {
            info!(worker = %worker.id(), "Staged, waiting for the active instance to be released");
            return Ok(UpdateOutcome::Waiting { staged });
        }

        match self.promote().await? {
            Some(activation) => Ok(UpdateOutcome::Promoted { staged, activation }),
            None => Ok(UpdateOutcome::Waiting { staged }),
        }
    }

    /// Activate the waiting instance and make it the active one
    ///
    /// The instance becomes active even when activation reset the caches;
    /// it serves from an empty content cache and refills lazily.
    pub async fn promote(&self) -> PrecacheResult<Option<ActivationOutcome>> {
        let Some(worker) = self.slots.lock().await.waiting.take() else {
            return Ok(None);
        };

        let activation = match worker.dispatch(WorkerEvent::Activate).await? {
            EventOutcome::Activated(outcome) => outcome,
            _ => return Ok(None),
        };

        let previous = self.slots.lock().await.active.replace(worker);
        if let Some(previous) = previous {
            previous.lifecycle().retire().await;
        }
        Ok(Some(activation))
    }

    /// Route a request through the active instance, if one is serving
    pub async fn fetch(&self, request: Request) -> PrecacheResult<FetchOutcome> {
        let Some(worker) = self.active().await.filter(|w| w.state().is_serving()) else {
            return Ok(FetchOutcome::Passthrough);
        };
        match worker.dispatch(WorkerEvent::Fetch(request)).await? {
            EventOutcome::Fetched(outcome) => Ok(outcome),
            _ => Ok(FetchOutcome::Passthrough),
        }
    }

    /// Deliver a command to the newest instance that can act on it
    ///
    /// `force-activate` goes to the waiting instance and promotes it;
    /// `prefetch-all` runs on the active one.
    pub async fn message(&self, command: Command) -> PrecacheResult<Option<PrefetchReport>> {
        match command {
            Command::ForceActivate => {
                let Some(waiting) = self.waiting().await else {
                    debug!("No waiting instance for {}", command);
                    return Ok(None);
                };
                waiting.dispatch(WorkerEvent::Message(command)).await?;
                self.promote().await?;
                Ok(None)
            }
            Command::PrefetchAll => {
                let Some(active) = self.active().await else {
                    debug!("No active instance for {}", command);
                    return Ok(None);
                };
                match active.dispatch(WorkerEvent::Message(command)).await? {
                    EventOutcome::Prefetched(report) => Ok(Some(report)),
                    _ => Ok(None),
                }
            }
        }
    }
}
