//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions and
//! access timing, and builds the point-in-time report returned by `get_stats`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheStrategy;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// == Cache Stats ==
/// Running counters. Monotonic until `clear`, carried by backups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of entries removed to satisfy the size budget
    pub evictions: u64,
    /// Cumulative time spent inside `get`, in milliseconds
    pub access_time_total_ms: f64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Mean time per `get`, 0.0 before the first access.
    pub fn avg_access_time_ms(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.access_time_total_ms / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_access_time(&mut self, elapsed: Duration) {
        self.access_time_total_ms += elapsed.as_secs_f64() * 1000.0;
    }
}

// == Stats Snapshot ==
/// Point-in-time report combining counters, occupancy and configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
    pub entry_count: usize,
    pub size_bytes: u64,
    pub avg_access_time_ms: f64,
    pub memory_usage_mb: f64,
    /// Percentage of the size budget in use
    pub cache_utilization: f64,
    pub hot_entries: usize,
    pub cold_entries: usize,
    pub cache_strategy: CacheStrategy,
    pub max_size_mb: f64,
    pub compression_enabled: bool,
    pub persistence_enabled: bool,
}

/// Occupancy and configuration inputs for a snapshot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Occupancy {
    pub entry_count: usize,
    pub size_bytes: u64,
    pub max_size_bytes: u64,
    pub hot_entries: usize,
    pub cold_entries: usize,
    pub strategy: CacheStrategy,
    pub compression_enabled: bool,
    pub persistence_enabled: bool,
}

impl StatsSnapshot {
    pub(crate) fn build(stats: &CacheStats, occupancy: Occupancy) -> Self {
        let cache_utilization = if occupancy.max_size_bytes == 0 {
            0.0
        } else {
            occupancy.size_bytes as f64 / occupancy.max_size_bytes as f64 * 100.0
        };

        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            hit_rate: stats.hit_rate(),
            entry_count: occupancy.entry_count,
            size_bytes: occupancy.size_bytes,
            avg_access_time_ms: stats.avg_access_time_ms(),
            memory_usage_mb: occupancy.size_bytes as f64 / BYTES_PER_MB,
            cache_utilization,
            hot_entries: occupancy.hot_entries,
            cold_entries: occupancy.cold_entries,
            cache_strategy: occupancy.strategy,
            max_size_mb: occupancy.max_size_bytes as f64 / BYTES_PER_MB,
            compression_enabled: occupancy.compression_enabled,
            persistence_enabled: occupancy.persistence_enabled,
        }
    }
}
