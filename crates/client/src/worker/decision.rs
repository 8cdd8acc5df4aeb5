//! Outcomes of the three lifecycle handlers.

use bgsw_core::Error;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::fetch::FetchResponse;

/// Result of a successful install.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub store: String,
    pub cached: usize,
    /// Ask the host to activate now instead of waiting for open pages to close.
    pub skip_waiting: bool,
}

/// Result of a successful activation.
#[derive(Debug, Clone, Serialize)]
pub struct ActivateReport {
    pub store: String,
    /// Stale stores removed, oldest first.
    pub deleted: Vec<String>,
    /// Ask the host to hand already-open pages to this worker.
    pub claimed: bool,
}

/// Background write of a network response into the current store.
///
/// Dropping it detaches the write; `wait` observes its outcome.
#[derive(Debug)]
pub struct WriteBack {
    handle: JoinHandle<Result<(), Error>>,
}

impl WriteBack {
    pub(crate) fn new(handle: JoinHandle<Result<(), Error>>) -> Self {
        Self { handle }
    }

    /// Await the write. The response was already returned; this only reports
    /// whether the copy landed in the store.
    pub async fn wait(self) -> Result<(), Error> {
        self.handle.await.map_err(|e| Error::CacheWrite(e.to_string()))?
    }
}

/// What the worker did with an intercepted request.
#[derive(Debug)]
pub enum Decision {
    /// Not intercepted; the request proceeds natively.
    Passthrough,
    /// Answered from the current store without touching the network.
    Serve(FetchResponse),
    /// Answered from the network. `write_back` is set when a copy is being stored.
    Network { response: FetchResponse, write_back: Option<WriteBack> },
}

impl Decision {
    pub fn is_passthrough(&self) -> bool {
        matches!(self, Decision::Passthrough)
    }

    pub fn is_cache_hit(&self) -> bool {
        matches!(self, Decision::Serve(_))
    }

    pub fn response(&self) -> Option<&FetchResponse> {
        match self {
            Decision::Passthrough => None,
            Decision::Serve(response) | Decision::Network { response, .. } => Some(response),
        }
    }

    /// Split into the response for the page and the pending write, if any.
    pub fn into_parts(self) -> (Option<FetchResponse>, Option<WriteBack>) {
        match self {
            Decision::Passthrough => (None, None),
            Decision::Serve(response) => (Some(response), None),
            Decision::Network { response, write_back } => (Some(response), write_back),
        }
    }
}
