//! Configuration Module
//!
//! Handles cache construction parameters and the maintenance schedule of the
//! owning process, loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheStrategy;
use crate::error::{CacheError, Result};

/// Cache construction parameters.
///
/// Set once when the store is built and immutable afterwards.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Size budget in megabytes (fractional values allowed)
    pub max_cache_size_mb: f64,
    /// Eviction strategy
    pub cache_strategy: CacheStrategy,
    /// TTL in seconds for entries stored without an override
    pub default_ttl_seconds: u64,
    /// Compress stored values with zstd
    pub enable_compression: bool,
    /// zstd level used when compression is enabled
    pub compression_level: i32,
    /// Save and load snapshots under `cache_dir`
    pub enable_persistence: bool,
    /// Snapshot directory, required when persistence is enabled
    pub cache_dir: Option<PathBuf>,
}

impl CacheConfig {
    /// Preset for vector embeddings: large, long-lived, compressed.
    pub fn embeddings() -> Self {
        Self {
            max_cache_size_mb: 500.0,
            cache_strategy: CacheStrategy::Adaptive,
            default_ttl_seconds: 7200,
            ..Self::default()
        }
    }

    /// Preset for similarity-search results: smaller and short-lived.
    pub fn search_results() -> Self {
        Self {
            max_cache_size_mb: 200.0,
            cache_strategy: CacheStrategy::Lru,
            default_ttl_seconds: 1800,
            ..Self::default()
        }
    }

    /// Preset for derived demographic profiles: read often, rarely change.
    pub fn profiles() -> Self {
        Self {
            max_cache_size_mb: 100.0,
            cache_strategy: CacheStrategy::Lfu,
            default_ttl_seconds: 3600,
            ..Self::default()
        }
    }

    /// Budget in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        (self.max_cache_size_mb * 1024.0 * 1024.0) as u64
    }

    /// Rejects combinations the store cannot honour.
    pub fn validate(&self) -> Result<()> {
        if !self.max_cache_size_mb.is_finite() || self.max_size_bytes() == 0 {
            return Err(CacheError::InvalidConfig(format!(
                "max_cache_size_mb must be positive, got {}",
                self.max_cache_size_mb
            )));
        }
        if self.enable_persistence && self.cache_dir.is_none() {
            return Err(CacheError::InvalidConfig(
                "cache_dir is required when persistence is enabled".to_string(),
            ));
        }
        if !(1..=22).contains(&self.compression_level) {
            return Err(CacheError::InvalidConfig(format!(
                "compression_level must be within 1..=22, got {}",
                self.compression_level
            )));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size_mb: 100.0,
            cache_strategy: CacheStrategy::Adaptive,
            default_ttl_seconds: 3600,
            enable_compression: true,
            compression_level: 3,
            enable_persistence: false,
            cache_dir: None,
        }
    }
}

/// Process configuration: the cache plus the maintenance schedule.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache construction parameters
    pub cache: CacheConfig,
    /// Interval in seconds between expiry sweeps
    pub cleanup_interval: u64,
    /// Interval in seconds between hot/cold reclassification
    pub optimize_interval: u64,
    /// Interval in seconds between snapshots (persistence only)
    pub snapshot_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE_MB` - Size budget in MB (default: 100)
    /// - `CACHE_STRATEGY` - `lru`, `lfu` or `adaptive` (default: adaptive)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `CACHE_COMPRESSION` - Enable zstd compression (default: true)
    /// - `CACHE_COMPRESSION_LEVEL` - zstd level (default: 3)
    /// - `CACHE_PERSISTENCE` - Enable snapshots (default: false)
    /// - `CACHE_DIR` - Snapshot directory (no default)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 60)
    /// - `OPTIMIZE_INTERVAL` - Reclassification frequency in seconds (default: 300)
    /// - `SNAPSHOT_INTERVAL` - Snapshot frequency in seconds (default: 600)
    pub fn from_env() -> Self {
        let defaults = CacheConfig::default();
        let cache = CacheConfig {
            max_cache_size_mb: parse_var("CACHE_MAX_SIZE_MB").unwrap_or(defaults.max_cache_size_mb),
            cache_strategy: parse_var("CACHE_STRATEGY").unwrap_or(defaults.cache_strategy),
            default_ttl_seconds: parse_var("CACHE_DEFAULT_TTL")
                .unwrap_or(defaults.default_ttl_seconds),
            enable_compression: parse_var("CACHE_COMPRESSION")
                .unwrap_or(defaults.enable_compression),
            compression_level: parse_var("CACHE_COMPRESSION_LEVEL")
                .unwrap_or(defaults.compression_level),
            enable_persistence: parse_var("CACHE_PERSISTENCE")
                .unwrap_or(defaults.enable_persistence),
            cache_dir: env::var("CACHE_DIR").ok().map(PathBuf::from),
        };

        Self {
            cache,
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(60),
            optimize_interval: parse_var("OPTIMIZE_INTERVAL").unwrap_or(300),
            snapshot_interval: parse_var("SNAPSHOT_INTERVAL").unwrap_or(600),
        }
    }

    pub fn cleanup_every(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval.max(1))
    }

    pub fn optimize_every(&self) -> Duration {
        Duration::from_secs(self.optimize_interval.max(1))
    }

    pub fn snapshot_every(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            cleanup_interval: 60,
            optimize_interval: 300,
            snapshot_interval: 600,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
