//! Instance lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an instance is in its install -> activate cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Constructed, install not started
    Parsed,
    /// Fetching shell resources into staging
    Installing,
    /// Shell resources staged; eligible to activate
    Staged,
    /// Diffing, evicting and promoting
    Activating,
    /// Content cache consistent with this release; serving
    Active,
    /// Activation failed and every namespace was wiped
    Reset,
    /// Install failed, or replaced by a newer instance
    Redundant,
}

impl LifecycleState {
    /// Whether the instance may serve intercepted requests
    pub fn is_serving(&self) -> bool {
        matches!(self, Self::Active | Self::Reset)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Staged => "staged",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Reset => "reset",
            Self::Redundant => "redundant",
        };
        write!(f, "{}", name)
    }
}
