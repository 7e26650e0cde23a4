//! Cache generation lifecycle
//!
//! An instance moves through these states:
//!
//! | State | Meaning |
//! |-------|---------|
//! | parsed | Constructed with its release |
//! | installing | Fetching shell resources into its staging namespace |
//! | staged | Ready to activate |
//! | activating | Diffing the manifest record, evicting, promoting |
//! | active | Content cache consistent with the release |
//! | reset | Activation failed; all namespaces wiped |
//! | redundant | Install failed or replaced by a newer instance |

pub mod controller;
pub mod state;

pub use controller::{ActivationMode, ActivationOutcome, ActivationReport, LifecycleController};
pub use state::LifecycleState;

use crate::context::Namespaces;
use crate::error::PrecacheResult;
use crate::storage::CacheStorage;
use tracing::{info, warn};

/// Delete the content, manifest and every staging namespace
///
/// Attempts every deletion even if one fails; the first failure is returned
/// after the others ran. Returns the namespaces that existed and were removed.
pub async fn wipe_namespaces(
    storage: &dyn CacheStorage,
    namespaces: &Namespaces,
) -> PrecacheResult<Vec<String>> {
    let mut targets = vec![namespaces.content.clone(), namespaces.manifest.clone()];
    match storage.namespaces().await {
        Ok(existing) => targets.extend(existing.into_iter().filter(|n| namespaces.is_staging(n))),
        Err(e) => warn!("Could not list staging namespaces: {}", e),
    }

    let mut removed = vec![];
    let mut first_error = None;
    for name in targets {
        match storage.delete_namespace(&name).await {
            Ok(true) => removed.push(name),
            Ok(false) => {}
            Err(e) => {
                warn!("Failed to delete namespace {}: {}", name, e);
                first_error.get_or_insert(e);
            }
        }
    }

    info!("Wiped {} namespace(s)", removed.len());
    match first_error {
        Some(e) => Err(e),
        None => Ok(removed),
    }
}
