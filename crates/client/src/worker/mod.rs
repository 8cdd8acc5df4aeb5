//! The offline asset cache worker.
//!
//! ### Install
//! Fetch every manifest asset not covered by an exclusion rule and store
//! them all in the current store in one transaction, or store nothing. Any
//! network failure or non-ok status fails the install and leaves the worker
//! `Redundant`.
//!
//! ### Activate
//! Delete every store whose name is not the current version, then claim
//! open pages.
//!
//! ### Fetch
//! Policy, in order: decline before activation, non-GET, non-http(s) and
//! excluded URLs; serve a hit from the current store; otherwise go to the
//! network and, when write-back is on and the response is cacheable, store
//! a copy in the background.

mod decision;
mod state;

pub use decision::{ActivateReport, Decision, InstallReport, WriteBack};
pub use state::WorkerState;

use async_trait::async_trait;
use bgsw_core::{CacheDb, Error};
use futures_util::future::try_join_all;
use reqwest::Method;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::fetch::{FetchRequest, FetchResponse, Network, canonicalize, is_cacheable_scheme};
use crate::policy::{CachePolicy, is_cacheable};

/// The three entry points the host runtime drives.
#[async_trait]
pub trait LifecycleHandler: Send + Sync {
    /// Populate the current store with the manifest.
    async fn on_install(&self) -> Result<InstallReport, Error>;

    /// Remove stale stores and take control of open pages.
    async fn on_activate(&self) -> Result<ActivateReport, Error>;

    /// Decide how to answer an outgoing request.
    async fn on_fetch(&self, request: &FetchRequest) -> Result<Decision, Error>;
}

/// Offline cache worker bound to one cache version.
pub struct ServiceWorker<N> {
    db: CacheDb,
    network: Arc<N>,
    policy: CachePolicy,
    state: RwLock<WorkerState>,
}

impl<N: Network> ServiceWorker<N> {
    pub fn new(db: CacheDb, network: Arc<N>, policy: CachePolicy) -> Self {
        Self { db, network, policy, state: RwLock::new(WorkerState::Parsed) }
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    async fn transition(&self, from: WorkerState, to: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if *state != from {
            return Err(Error::InvalidState { expected: from.to_string(), actual: state.to_string() });
        }
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: WorkerState) {
        *self.state.write().await = to;
    }

    async fn precache(&self) -> Result<usize, Error> {
        let mut urls = self.policy.manifest.resolve_all(&self.policy.origin)?;
        urls.retain(|url| match self.policy.exclusions.matching(url.as_str()) {
            Some(pattern) => {
                tracing::warn!(url = %url, pattern, "manifest asset is excluded, not pre-caching");
                false
            }
            None => true,
        });

        let fetches = urls.into_iter().map(|url| async move {
            let response = self.network.perform(&FetchRequest::get(url.clone())).await?;
            if !response.is_ok() {
                return Err(Error::HttpError { url: url.to_string(), status: response.status.as_u16() });
            }
            Ok((url.to_string(), response.to_stored()))
        });
        let entries = try_join_all(fetches).await?;

        let store = self.db.open_store(&self.policy.version).await?;
        store.put_all(entries).await
    }

    async fn evict_stale(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.db.store_names().await? {
            if name == self.policy.version {
                continue;
            }
            if self.db.delete_store(&name).await? {
                tracing::debug!(store = %name, "deleted stale cache store");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }
}

#[async_trait]
impl<N: Network + 'static> LifecycleHandler for ServiceWorker<N> {
    async fn on_install(&self) -> Result<InstallReport, Error> {
        self.transition(WorkerState::Parsed, WorkerState::Installing).await?;

        match self.precache().await {
            Ok(cached) => {
                self.set_state(WorkerState::Installed).await;
                tracing::info!(store = %self.policy.version, cached, "install complete");
                Ok(InstallReport { store: self.policy.version.clone(), cached, skip_waiting: true })
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                tracing::warn!(store = %self.policy.version, error = %e, "install failed");
                Err(e)
            }
        }
    }

    async fn on_activate(&self) -> Result<ActivateReport, Error> {
        self.transition(WorkerState::Installed, WorkerState::Activating).await?;

        match self.evict_stale().await {
            Ok(deleted) => {
                self.set_state(WorkerState::Activated).await;
                tracing::info!(store = %self.policy.version, deleted = deleted.len(), "activated");
                Ok(ActivateReport { store: self.policy.version.clone(), deleted, claimed: true })
            }
            Err(e) => {
                self.set_state(WorkerState::Installed).await;
                tracing::warn!(store = %self.policy.version, error = %e, "activation failed");
                Err(e)
            }
        }
    }

    async fn on_fetch(&self, request: &FetchRequest) -> Result<Decision, Error> {
        if !self.state().await.can_intercept_fetch() {
            return Ok(Decision::Passthrough);
        }
        if request.method != Method::GET || !is_cacheable_scheme(&request.url) {
            return Ok(Decision::Passthrough);
        }

        let url = canonicalize(&request.url);
        if let Some(pattern) = self.policy.exclusions.matching(url.as_str()) {
            tracing::debug!(url = %url, pattern, "excluded from cache");
            return Ok(Decision::Passthrough);
        }

        let store = self.db.store(&self.policy.version);
        match store.match_request("GET", url.as_str()).await {
            Ok(Some(stored)) => {
                tracing::debug!(url = %url, "cache hit");
                return Ok(Decision::Serve(FetchResponse::from_stored(request.url.clone(), stored)));
            }
            Ok(None) => tracing::debug!(url = %url, "cache miss"),
            Err(e) => tracing::warn!(url = %url, error = %e, "cache read failed, using network"),
        }

        let response = self.network.perform(request).await?;

        if !self.policy.write_back || !is_cacheable(&response) {
            return Ok(Decision::Network { response, write_back: None });
        }

        let copy = response.to_stored();
        let key = url.to_string();
        let handle = tokio::spawn(async move {
            let result = store.put("GET", &key, &copy).await;
            if let Err(e) = &result {
                tracing::warn!(url = %key, error = %e, "cache write-back failed");
            }
            result
        });

        Ok(Decision::Network { response, write_back: Some(WriteBack::new(handle)) })
    }
}
