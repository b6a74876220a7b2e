//! Hodge-Vegas - Entry Point
//!
//! Initializes configuration, logging, feeds and the scan engine.
//! Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate (path from argv[1], default `config.toml`)
//! 2. Init tracing (JSON structured logging)
//! 3. Create snapshot feeds (OddsFeed, MarketFeed ports)
//! 4. Create intent journal (OrderExecution port)
//! 5. Build the engine context (dedup cache + regime history)
//! 6. Spawn metrics (:9090) and health (/live + /ready) servers
//! 7. Spawn the scan loop (fixed interval)
//! 8. Wait for SIGINT → graceful shutdown

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use hodge_vegas::adapters::feeds::{SnapshotMarketFeed, SnapshotOddsFeed};
use hodge_vegas::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use hodge_vegas::adapters::persistence::IntentJournal;
use hodge_vegas::config;
use hodge_vegas::usecases::{EngineContext, ScanEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.engine.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.engine.name,
        version = env!("CARGO_PKG_VERSION"),
        dry_run = config.engine.dry_run,
        config = %config_path,
        "Starting Hodge-Vegas engine"
    );

    if config.engine.dry_run {
        warn!("Dry-run mode: intents computed and logged, NOTHING submitted");
    }

    // ── 3. Shutdown signal channel ──────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. Adapters ─────────────────────────────────────────
    let odds_feed = Arc::new(SnapshotOddsFeed::new(&config.feeds.odds_snapshot_path));
    let market_feed = Arc::new(SnapshotMarketFeed::new(&config.feeds.market_snapshot_path));
    let journal = Arc::new(
        IntentJournal::new(&config.journal.data_dir)
            .await
            .context("Failed to open intent journal")?,
    );

    // ── 5. Engine context + scan engine ─────────────────────
    let ctx = Arc::new(EngineContext::init(&config));
    let engine = ScanEngine::new(odds_feed, market_feed, journal, Arc::clone(&ctx), &config);

    // ── 6. Metrics + health servers ─────────────────────────
    let health = Arc::new(HealthState::new());
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to create metrics registry")?);

    let mut server_handles = Vec::new();
    if config.metrics.enabled {
        let metrics_ref = Arc::clone(&metrics);
        let bind = config.metrics.bind_address.clone();
        let rx = shutdown_tx.subscribe();
        server_handles.push(tokio::spawn(async move {
            if let Err(e) = metrics_ref.serve(bind, rx).await {
                error!(error = %e, "Metrics server failed");
            }
        }));

        let health_server = HealthServer::new(Arc::clone(&health), config.metrics.health_port);
        let rx = shutdown_tx.subscribe();
        server_handles.push(tokio::spawn(async move {
            if let Err(e) = health_server.run(rx).await {
                error!(error = %e, "Health server failed");
            }
        }));
    }

    // ── 7. Scan loop ────────────────────────────────────────
    let engine_shutdown = shutdown_tx.subscribe();
    let engine_health = Arc::clone(&health);
    let engine_metrics = Arc::clone(&metrics);
    let engine_handle = tokio::spawn(async move {
        engine_health.set_engine_running(true);
        let result = engine
            .run(engine_shutdown, |report| {
                engine_health.set_feeds_healthy(report.odds_fetched);
                engine_metrics.record_cycle(report);
            })
            .await;
        engine_health.set_engine_running(false);
        if let Err(e) = result {
            error!(error = %e, "Scan engine failed");
        }
    });

    info!("All tasks spawned, engine is running");

    // ── 8. Wait for SIGINT ──────────────────────────────────
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for SIGINT, shutting down");
    } else {
        info!("SIGINT received, initiating graceful shutdown");
    }

    // Readiness probe → 503 while draining
    health.set_engine_running(false);
    let _ = shutdown_tx.send(());

    // Engine drains its context on the way out (up to 30s)
    if tokio::time::timeout(Duration::from_secs(30), engine_handle)
        .await
        .is_err()
    {
        warn!("Scan engine did not stop within 30s");
    }

    for handle in server_handles {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}
