//! Embedding Cache - maintenance host
//!
//! Owns a cache instance for the lifetime of the process: loads the persisted
//! snapshot at start, runs scheduled maintenance and flushes a final snapshot
//! on shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use embedding_cache::{spawn_maintenance_task, CacheStore, Config, MaintenanceSchedule};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache store (loading a snapshot if persistence is on)
/// 4. Start the maintenance task
/// 5. Wait for SIGINT/SIGTERM, then stop maintenance and flush a snapshot
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "embedding_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting embedding cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_size={}MB, strategy={}, default_ttl={}s, compression={}, persistence={}",
        config.cache.max_cache_size_mb,
        config.cache.cache_strategy,
        config.cache.default_ttl_seconds,
        config.cache.enable_compression,
        config.cache.enable_persistence
    );

    let cache = Arc::new(
        CacheStore::new(config.cache.clone()).context("invalid cache configuration")?,
    );
    let stats = cache.get_stats();
    info!(
        "Cache store initialized with {} entries ({:.2} MB)",
        stats.entry_count, stats.memory_usage_mb
    );

    let maintenance = spawn_maintenance_task(cache.clone(), MaintenanceSchedule::from_config(&config));

    shutdown_signal().await;

    maintenance.abort();
    warn!("Maintenance task aborted");

    let flush_cache = cache.clone();
    tokio::task::spawn_blocking(move || flush_cache.shutdown())
        .await
        .context("final snapshot task failed")?;

    let stats = cache.get_stats();
    info!(
        "Shutdown complete: {} hits, {} misses, {} evictions, hit rate {:.1}%",
        stats.hits,
        stats.misses,
        stats.evictions,
        stats.hit_rate * 100.0
    );
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
