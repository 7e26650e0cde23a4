//! Event dispatch for one worker instance
//!
//! A worker owns the lifecycle controller, fetch interceptor and offline
//! prefetcher of one release. Events reach it either through
//! [`Worker::dispatch`] or through the channel behind [`WorkerHandle`],
//! which runs every event as its own task so fetches never wait on each
//! other.

use crate::context::WorkerContext;
use crate::error::{PrecacheError, PrecacheResult};
use crate::intercept::{FetchInterceptor, FetchOutcome};
use crate::lifecycle::{ActivationOutcome, LifecycleController, LifecycleState};
use crate::prefetch::{OfflinePrefetcher, PrefetchReport};
use crate::request::Request;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};
use uuid::Uuid;

/// Pending events buffered per worker
const EVENT_QUEUE_DEPTH: usize = 64;

/// Out-of-band control commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Replace the active instance without waiting
    ForceActivate,
    /// Fill every manifest resource not yet cached
    PrefetchAll,
}

impl FromStr for Command {
    type Err = PrecacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "force-activate" | "skipWaiting" => Ok(Self::ForceActivate),
            "prefetch-all" | "downloadOffline" => Ok(Self::PrefetchAll),
            other => Err(PrecacheError::User(format!("Unknown command: {}", other))),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForceActivate => write!(f, "force-activate"),
            Self::PrefetchAll => write!(f, "prefetch-all"),
        }
    }
}

/// Events a worker handles
#[derive(Debug)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Message(Command),
}

/// What handling an event produced
#[derive(Debug)]
pub enum EventOutcome {
    Installed { staged: usize },
    Activated(ActivationOutcome),
    Fetched(FetchOutcome),
    TakeoverRequested,
    Prefetched(PrefetchReport),
}

/// One instance serving one release
pub struct Worker {
    id: Uuid,
    lifecycle: LifecycleController,
    interceptor: FetchInterceptor,
    prefetcher: OfflinePrefetcher,
}

impl Worker {
    pub fn new(ctx: WorkerContext) -> Self {
        let id = Uuid::new_v4();
        let short_id = id.simple().to_string()[..8].to_string();
        Self {
            id,
            lifecycle: LifecycleController::new(ctx.clone(), short_id),
            interceptor: FetchInterceptor::new(ctx.clone()),
            prefetcher: OfflinePrefetcher::new(ctx),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn lifecycle(&self) -> &LifecycleController {
        &self.lifecycle
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn prefetcher(&self) -> &OfflinePrefetcher {
        &self.prefetcher
    }

    /// Route an event to its handler
    pub async fn dispatch(&self, event: WorkerEvent) -> PrecacheResult<EventOutcome> {
        debug!(worker = %self.id, ?event, "Dispatching");
        match event {
            WorkerEvent::Install => self.on_install().await,
            WorkerEvent::Activate => self.on_activate().await,
            WorkerEvent::Fetch(request) => self.on_fetch(request).await,
            WorkerEvent::Message(command) => self.on_message(command).await,
        }
    }

    async fn on_install(&self) -> PrecacheResult<EventOutcome> {
        let staged = self.lifecycle.install().await?;
        Ok(EventOutcome::Installed { staged })
    }

    async fn on_activate(&self) -> PrecacheResult<EventOutcome> {
        let outcome = self.lifecycle.activate().await?;
        Ok(EventOutcome::Activated(outcome))
    }

    async fn on_fetch(&self, request: Request) -> PrecacheResult<EventOutcome> {
        let outcome = self.interceptor.handle(&request).await?;
        Ok(EventOutcome::Fetched(outcome))
    }

    async fn on_message(&self, command: Command) -> PrecacheResult<EventOutcome> {
        info!(worker = %self.id, "Received {}", command);
        match command {
            Command::ForceActivate => {
                self.lifecycle.request_takeover();
                Ok(EventOutcome::TakeoverRequested)
            }
            Command::PrefetchAll => {
                let report = self.prefetcher.prefetch_all().await?;
                Ok(EventOutcome::Prefetched(report))
            }
        }
    }

    /// Start the event loop; each received event runs as its own task
    pub fn spawn(self: Arc<Self>) -> WorkerHandle {
        let (tx, mut rx) = mpsc::channel::<Envelope>(EVENT_QUEUE_DEPTH);
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let worker = self.clone();
                tokio::spawn(async move {
                    let result = worker.dispatch(envelope.event).await;
                    // The sender may have given up waiting
                    let _ = envelope.reply.send(result);
                });
            }
            debug!(worker = %self.id, "Event loop stopped");
        });
        WorkerHandle { tx }
    }
}

struct Envelope {
    event: WorkerEvent,
    reply: oneshot::Sender<PrecacheResult<EventOutcome>>,
}

/// Sends events to a spawned worker; dropping every handle stops its loop
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Envelope>,
}

impl WorkerHandle {
    pub async fn send(&self, event: WorkerEvent) -> PrecacheResult<EventOutcome> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Envelope { event, reply })
            .await
            .map_err(|_| PrecacheError::Internal("worker event loop stopped".to_string()))?;
        response
            .await
            .map_err(|_| PrecacheError::Internal("worker dropped the event".to_string()))?
    }
}
