//! Background Tasks Module
//!
//! Maintenance the owning process schedules around a cache. The library
//! never starts these on its own.
//!
//! # Tasks
//! - Expiry sweep: removes expired entries
//! - Optimization: recomputes the hot/cold classification
//! - Snapshot: saves the cache when persistence is enabled

mod maintenance;

pub use maintenance::{spawn_maintenance_task, MaintenanceSchedule};
