//! tuneverse-sw entry point.
//!
//! Boots the offline worker over a SQLite cache and serves it as an MCP
//! server on stdio transport. Logging goes to stderr to avoid interfering with
//! the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use tuneverse_client::worker::{InMemoryClients, InMemoryNotifications};
use tuneverse_client::{FetchConfig, HttpNetwork, Platform, ServiceWorker};
use tuneverse_core::{AppConfig, CacheDb};

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = Arc::new(AppConfig::load().context("failed to load configuration")?);
    tracing::info!(origin = %config.origin, "Starting tuneverse-sw on stdio transport");

    let db = Arc::new(CacheDb::open(&config.db_path).await?);
    let network = Arc::new(HttpNetwork::new(FetchConfig::from_app(&config), config.origin.clone())?);
    let platform = Platform::new(Arc::new(InMemoryClients::new()), Arc::new(InMemoryNotifications::granted()));
    let worker = Arc::new(ServiceWorker::new(config, db.clone(), network, platform)?);
    tracing::info!(version = worker.generation().version(), "worker generation");

    let report = worker.install().await?;
    if !report.failed.is_empty() {
        tracing::warn!(failed = ?report.failed, "some manifest assets were not pre-cached");
    }
    worker.advance().await?;

    let handler = handler::TuneVerseServer::new(worker.clone(), db);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    let pending = worker.lifetime().pending();
    if pending > 0 {
        tracing::info!(pending, "waiting for detached cache writes");
    }
    worker.settled().await;

    Ok(())
}
