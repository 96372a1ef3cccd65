//! Open Interest Analyzer — Entry Point
//!
//! Initializes configuration, logging, exchange adapters, and the ingestion
//! tasks. Runs until SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Build the shared metric store
//! 4. Build exchange adapters from the static registry (skip broken entries)
//! 5. Spawn one streaming subscriber per adapter (auto-reconnect WebSocket)
//! 6. Spawn the periodic poll refresher (initial refresh + fixed interval)
//! 7. Spawn the HTTP query facade
//! 8. Wait for SIGINT → graceful shutdown with bounded join timeouts

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use oi_analyzer::adapters;
use oi_analyzer::config;
use oi_analyzer::feeds::{FeedSupervisor, PollRefresher};
use oi_analyzer::server::{self, AppState};
use oi_analyzer::store::MetricStore;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config =
        config::loader::load_config("config.toml").context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(&config.service.log_level)
            }),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        exchanges = config.exchanges.len(),
        "Starting Open Interest Analyzer"
    );

    // ── 3. Shutdown signal channel ──────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. Shared metric store (single write path for all feeds) ──
    let store = Arc::new(MetricStore::new());

    // ── 5. Exchange adapters from the static registry ───────
    let adapters = adapters::registry::build_adapters(&config);
    anyhow::ensure!(
        !adapters.is_empty(),
        "No usable exchange adapters configured"
    );
    let exchange_ids: Vec<String> = adapters
        .iter()
        .map(|a| a.exchange().id().to_string())
        .collect();

    // ── 6. Streaming subscribers with auto-reconnect ────────
    let supervisor = Arc::new(FeedSupervisor::new(
        &adapters,
        &store,
        Duration::from_millis(config.ingest.reconnect_interval_ms),
        shutdown_tx.clone(),
    ));
    let stream_handles = supervisor.spawn();

    // ── 7. Periodic poll refresher ──────────────────────────
    let poller = Arc::new(PollRefresher::new(
        adapters,
        Arc::clone(&store),
        Duration::from_millis(config.ingest.poll_interval_ms),
    ));
    let poller_ref = Arc::clone(&poller);
    let poller_shutdown = shutdown_tx.subscribe();
    let poller_handle = tokio::spawn(async move {
        if let Err(e) = poller_ref.run(poller_shutdown).await {
            error!(error = %e, "Poll refresher failed");
        }
    });

    // ── 8. HTTP query facade ────────────────────────────────
    let state = AppState {
        store: Arc::clone(&store),
        poller: Arc::clone(&poller),
        supervisor: Arc::clone(&supervisor),
        trend_epsilon: config.analysis.trend_epsilon,
        exchanges: exchange_ids,
        service_name: config.service.name.clone(),
        started_at: Utc::now(),
    };
    let bind_address = config.service.bind_address.clone();
    let server_shutdown = shutdown_tx.subscribe();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::serve(state, &bind_address, server_shutdown).await {
            error!(error = %e, "Query facade failed");
        }
    });

    info!("All tasks spawned — analyzer is running");

    // ── 9. Wait for SIGINT ──────────────────────────────────
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
        }
    }

    // ── Graceful shutdown ───────────────────────────────────

    // 1. Signal all tasks to stop; in-flight requests finish naturally.
    let _ = shutdown_tx.send(());
    info!("Shutdown signal broadcast to all tasks");

    // 2. Wait for streaming subscribers to close (up to 5s each).
    for handle in stream_handles {
        if tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .is_err()
        {
            warn!("Streaming task did not stop in time");
        }
    }

    // 3. Wait for the poll refresher (in-flight polls may finish first).
    let _ = tokio::time::timeout(Duration::from_secs(10), poller_handle).await;

    // 4. Wait for the facade to drain.
    let _ = tokio::time::timeout(Duration::from_secs(5), server_handle).await;

    info!("Shutdown complete");
    Ok(())
}
