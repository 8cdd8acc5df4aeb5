//! bg-sw entry point.
//!
//! Drives the worker lifecycle against the configured origin: install,
//! activate, and optionally route URLs through fetch interception.
//! Reports go to stdout as JSON; logging goes to stderr.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = commands::Cli::parse();
    let config = bgsw_core::AppConfig::load()?;

    tracing::info!(store = %config.cache_version, origin = %config.origin, "starting bg-sw");

    let report = commands::execute(cli.command, &config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
