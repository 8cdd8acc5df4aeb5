//! Subcommands of the lifecycle runner.

use std::sync::Arc;

use anyhow::{Context, Result};
use bgsw_client::{
    ActivateReport, CachePolicy, Decision, FetchClient, FetchConfig, FetchRequest, InstallReport, LifecycleHandler,
    ServiceWorker,
};
use bgsw_core::{AppConfig, CacheDb};
use clap::{Parser, Subcommand};
use reqwest::Url;
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "bg-sw", version, about = "Offline asset cache for the BlindGuide front-end")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Install and activate the configured version, then route each URL through the cache.
    Run {
        /// Absolute URLs or paths relative to the origin.
        urls: Vec<String>,
    },
    /// List cache stores and their entries.
    Stores,
}

#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Report {
    Run { install: InstallReport, activate: ActivateReport, fetches: Vec<FetchOutcome> },
    Stores { stores: Vec<StoreSummary> },
}

#[derive(Debug, Serialize)]
pub struct FetchOutcome {
    pub url: String,
    /// "passthrough", "cache" or "network".
    pub source: &'static str,
    pub status: Option<u16>,
    pub bytes: Option<usize>,
    /// Whether a copy landed in the store; `None` when no write was attempted.
    pub stored: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct StoreSummary {
    pub name: String,
    pub current: bool,
    pub entries: Vec<String>,
}

pub async fn execute(command: Command, config: &AppConfig) -> Result<Report> {
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;

    match command {
        Command::Run { urls } => run(db, config, &urls).await,
        Command::Stores => stores(&db, config).await,
    }
}

async fn run(db: CacheDb, config: &AppConfig, urls: &[String]) -> Result<Report> {
    let policy = CachePolicy::from_config(config)?;
    let origin = policy.origin.clone();
    let network = Arc::new(FetchClient::new(FetchConfig::from(config))?);
    let worker = ServiceWorker::new(db, network, policy);

    let install = worker.on_install().await.context("install failed")?;
    let activate = worker.on_activate().await.context("activation failed")?;

    let mut fetches = Vec::with_capacity(urls.len());
    for raw in urls {
        let url = origin.join(raw).with_context(|| format!("invalid url {raw}"))?;
        fetches.push(route(&worker, url).await?);
    }

    Ok(Report::Run { install, activate, fetches })
}

async fn route(worker: &ServiceWorker<FetchClient>, url: Url) -> Result<FetchOutcome> {
    let decision = worker.on_fetch(&FetchRequest::get(url.clone())).await?;
    let source = match &decision {
        Decision::Passthrough => "passthrough",
        Decision::Serve(_) => "cache",
        Decision::Network { .. } => "network",
    };

    let (response, write_back) = decision.into_parts();
    let stored = match write_back {
        Some(pending) => Some(pending.wait().await.is_ok()),
        None => None,
    };

    Ok(FetchOutcome {
        url: url.to_string(),
        source,
        status: response.as_ref().map(|r| r.status.as_u16()),
        bytes: response.as_ref().map(|r| r.bytes.len()),
        stored,
    })
}

async fn stores(db: &CacheDb, config: &AppConfig) -> Result<Report> {
    let mut stores = Vec::new();
    for name in db.store_names().await? {
        let entries = db.store(&name).keys().await?;
        stores.push(StoreSummary { current: name == config.cache_version, name, entries });
    }
    Ok(Report::Stores { stores })
}
