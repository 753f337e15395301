//! scrapecache server entry point.
//!
//! Boots the HTTP API over the page store. Logging goes to stderr as JSON.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use scrapecache_client::{FetchConfig, Fetcher, PageFetcher};
use scrapecache_core::{AppConfig, PageStore};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod coordinator;
mod error;
mod handler;
mod refresh;
mod routes;

use coordinator::Coordinator;
use handler::AppState;
use refresh::{RefreshOptions, RefreshQueue};

/// How long pending background refreshes may run after shutdown is requested.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let location = config.database_location()?;

    let store = PageStore::open(&location).await.context("failed to open page store")?;
    let refresh_store = store.detached().await.context("failed to open refresh store")?;

    let fetcher: Arc<dyn Fetcher> = Arc::new(PageFetcher::new(FetchConfig::from(&config))?);
    let (queue, workers) = RefreshQueue::start(refresh_store, Arc::clone(&fetcher), RefreshOptions::from(&config));
    let coordinator = Arc::new(Coordinator::new(store.clone(), fetcher, queue));

    let closing = store.clone();
    let app = handler::router(AppState { store, coordinator }, config.max_concurrent_requests);

    let addr: SocketAddr = config.bind_addr.parse().with_context(|| format!("invalid bind_addr {}", config.bind_addr))?;
    let listener = TcpListener::bind(addr).await.context("failed to bind to address")?;
    tracing::info!(%addr, database = %config.database_url, "starting scrapecache server");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.context("server error")?;

    // The router (and with it every queue sender) is gone; let workers drain.
    if tokio::time::timeout(DRAIN_TIMEOUT, workers.join()).await.is_err() {
        tracing::warn!("background refreshes still running at shutdown, abandoning them");
    }

    if let Err(e) = closing.close().await {
        tracing::warn!(error = %e, "page store did not close cleanly");
    }

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown requested");
    }
}
