//! Worker lifecycle states.

use serde::Serialize;
use std::fmt;

/// Where the worker is in its install → activate lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Constructed, install not yet run.
    Parsed,
    Installing,
    /// Manifest stored; waiting for activation.
    Installed,
    Activating,
    /// Controlling pages; fetches are intercepted.
    Activated,
    /// Install failed; the host discards this worker and keeps the previous one.
    Redundant,
}

impl WorkerState {
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}
