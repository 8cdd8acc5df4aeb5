//! Client side of the BlindGuide offline cache.
//!
//! This crate provides the network surface, the cache policy, and the
//! worker that sits between a page and the network.

pub mod fetch;
pub mod policy;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use fetch::{FetchClient, FetchConfig, FetchRequest, FetchResponse, Network};
pub use policy::{AssetManifest, CachePolicy, ExclusionRules, is_cacheable};
pub use worker::{ActivateReport, Decision, InstallReport, LifecycleHandler, ServiceWorker, WorkerState, WriteBack};
