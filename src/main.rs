//! imgsync — mirrors a remote image catalog into a local collection.
//!
//! Each run scans the local collection, fetches the catalog, and reports
//! what is missing per category. With `--download` the missing images are
//! fetched with bounded concurrency and fixed-delay retries, and written
//! atomically into a date-sharded directory tree. Runs are idempotent: an
//! image already on disk is never fetched again.

#![warn(clippy::all)]

mod catalog;
mod cli;
mod config;
mod download;
mod inventory;
mod reconcile;
mod retry;
mod shutdown;
mod sync;
mod types;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = config::Config::from_cli(cli)?;

    let filter = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    tracing::debug!(?config, "Starting imgsync");

    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let catalog = catalog::HttpCatalog::new(client.clone(), config.catalog_url.clone());
    let source: Arc<dyn download::ContentSource> = Arc::new(download::HttpContentSource::new(
        client,
        config.content_url.clone(),
    ));

    let shutdown_token = shutdown::install_signal_handler()?;

    // A catalog failure ends the run with a non-zero exit status; per-item
    // failures are only logged.
    let report = sync::run_sync(
        &catalog,
        source,
        &config.download_config(),
        config.download,
        shutdown_token.clone(),
    )
    .await
    .context("Catalog unavailable, aborting")?;

    if shutdown_token.is_cancelled() {
        tracing::info!(
            "Interrupted after downloading {} images",
            report.total_downloaded()
        );
    }

    Ok(())
}
