//! Embedding Cache - an adaptive, size-bounded object cache
//!
//! Holds expensive-to-recompute artifacts (embeddings, similarity-search
//! results, derived profiles) in front of a slower backing computation, with
//! LRU/LFU/adaptive eviction, zstd compression and snapshot persistence.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{generate_cache_key, CacheKeyBuilder, CacheStore, CacheStrategy, CacheValue};
pub use config::{CacheConfig, Config};
pub use error::CacheError;
pub use tasks::{spawn_maintenance_task, MaintenanceSchedule};
