//! Cache Maintenance Task
//!
//! Background task that periodically sweeps expired entries, reclassifies
//! hot/cold entries and, with persistence enabled, writes snapshots.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::config::Config;

/// Periods for each maintenance job.
#[derive(Debug, Clone, Copy)]
pub struct MaintenanceSchedule {
    pub cleanup_every: Duration,
    pub optimize_every: Duration,
    /// None disables periodic snapshots
    pub snapshot_every: Option<Duration>,
}

impl MaintenanceSchedule {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cleanup_every: config.cleanup_every(),
            optimize_every: config.optimize_every(),
            snapshot_every: config
                .cache
                .enable_persistence
                .then(|| config.snapshot_every()),
        }
    }
}

/// Spawns a task that runs the scheduled maintenance jobs until aborted.
///
/// # Arguments
/// * `cache` - Shared reference to the cache
/// * `schedule` - Job periods; each job first runs one period after spawn
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(CacheStore::new(CacheConfig::default())?);
/// let handle = spawn_maintenance_task(cache.clone(), MaintenanceSchedule::from_config(&config));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_maintenance_task(cache: Arc<CacheStore>, schedule: MaintenanceSchedule) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting cache maintenance: cleanup every {:?}, optimize every {:?}, snapshot every {:?}",
            schedule.cleanup_every, schedule.optimize_every, schedule.snapshot_every
        );

        let start = Instant::now();
        let mut cleanup = interval_at(start + schedule.cleanup_every, schedule.cleanup_every);
        let mut optimize = interval_at(start + schedule.optimize_every, schedule.optimize_every);
        // Without snapshots this timer still ticks but the branch is disabled
        let snapshot_period = schedule.snapshot_every.unwrap_or(Duration::from_secs(3600));
        let mut snapshot = interval_at(start + snapshot_period, snapshot_period);
        for timer in [&mut cleanup, &mut optimize, &mut snapshot] {
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }

        loop {
            tokio::select! {
                _ = cleanup.tick() => {
                    let cache = cache.clone();
                    match tokio::task::spawn_blocking(move || cache.cleanup_expired_entries()).await {
                        Ok(0) => debug!("TTL cleanup: no expired entries found"),
                        Ok(removed) => info!("TTL cleanup: removed {} expired entries", removed),
                        Err(e) => warn!("Cleanup task panicked: {}", e),
                    }
                }
                _ = optimize.tick() => {
                    let cache = cache.clone();
                    let optimized = tokio::task::spawn_blocking(move || {
                        cache.optimize_now();
                        cache.get_stats()
                    })
                    .await;
                    match optimized {
                        Ok(stats) => debug!(
                            "Optimization: {} hot, {} cold of {} entries, {:.1}% of budget",
                            stats.hot_entries, stats.cold_entries, stats.entry_count, stats.cache_utilization
                        ),
                        Err(e) => warn!("Optimization task panicked: {}", e),
                    }
                }
                _ = snapshot.tick(), if schedule.snapshot_every.is_some() => {
                    let cache = cache.clone();
                    match tokio::task::spawn_blocking(move || cache.save()).await {
                        Ok(true) => debug!("Periodic snapshot written"),
                        Ok(false) => warn!("Periodic snapshot failed"),
                        Err(e) => warn!("Snapshot task panicked: {}", e),
                    }
                }
            }
        }
    })
}
