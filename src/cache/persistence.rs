//! Persistence Module
//!
//! Snapshot format and file handling for `save`/`load` and `backup`/`restore`.
//!
//! Snapshots hold decoded values with wall-clock timestamps, so a snapshot
//! written by a compressing store loads into an uncompressed one and vice
//! versa. The format is JSON and carries no version marker.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, CacheStats, CacheValue};
use crate::error::Result;

/// File name of the periodic snapshot inside `cache_dir`.
pub const SNAPSHOT_FILE_NAME: &str = "cache_snapshot.json";

// == Snapshot ==
/// Full serialized copy of a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub saved_at: DateTime<Utc>,
    pub entries: Vec<PersistedEntry>,
    pub stats: CacheStats,
}

/// One entry with enough metadata to rebuild its bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEntry {
    pub key: String,
    pub value: CacheValue,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: u64,
    pub ttl_seconds: Option<u64>,
    pub last_access_tick: u64,
    pub inserted_tick: u64,
}

impl PersistedEntry {
    /// Captures an entry, mapping its monotonic timestamps onto the wall clock.
    pub fn capture(key: &str, value: CacheValue, entry: &CacheEntry, clock: &ClockPair) -> Self {
        Self {
            key: key.to_string(),
            value,
            created_at: clock.to_wall(entry.created_at),
            last_accessed_at: clock.to_wall(entry.last_accessed_at),
            access_count: entry.access_count,
            ttl_seconds: entry.ttl_seconds,
            last_access_tick: entry.last_access_tick,
            inserted_tick: entry.inserted_tick,
        }
    }

    /// Wall-clock expiry check, used when loading.
    pub fn is_expired_at(&self, now: DateTime<Utc>, default_ttl_seconds: u64) -> bool {
        let ttl = self.ttl_seconds.unwrap_or(default_ttl_seconds);
        let age = (now - self.created_at).to_std().unwrap_or(Duration::ZERO);
        age > Duration::from_secs(ttl)
    }

    /// Rebuilds the in-memory entry around freshly encoded bytes.
    pub fn into_entry(self, stored_value: Vec<u8>, clock: &ClockPair) -> CacheEntry {
        let mut entry = CacheEntry::new(stored_value, self.ttl_seconds, self.inserted_tick);
        entry.created_at = clock.to_instant(self.created_at);
        entry.last_accessed_at = clock.to_instant(self.last_accessed_at);
        entry.access_count = self.access_count;
        entry.last_access_tick = self.last_access_tick;
        entry
    }
}

// == Clock Pair ==
/// Simultaneous readings of the monotonic and wall clocks.
#[derive(Debug, Clone, Copy)]
pub struct ClockPair {
    pub instant: Instant,
    pub wall: DateTime<Utc>,
}

impl ClockPair {
    pub fn now() -> Self {
        Self {
            instant: Instant::now(),
            wall: Utc::now(),
        }
    }

    pub fn to_wall(&self, at: Instant) -> DateTime<Utc> {
        let age = self.instant.saturating_duration_since(at);
        chrono::Duration::from_std(age)
            .ok()
            .and_then(|age| self.wall.checked_sub_signed(age))
            .unwrap_or(self.wall)
    }

    /// Maps a wall time back to an `Instant`. Times older than the monotonic
    /// clock's origin collapse to now.
    pub fn to_instant(&self, at: DateTime<Utc>) -> Instant {
        let age = (self.wall - at).to_std().unwrap_or(Duration::ZERO);
        self.instant.checked_sub(age).unwrap_or(self.instant)
    }
}

/// Path of the periodic snapshot for a cache directory.
pub fn snapshot_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(SNAPSHOT_FILE_NAME)
}

/// Writes a snapshot through a sibling temp file and a rename, creating
/// parent directories as needed.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name: OsString = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    {
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        serde_json::to_writer(&mut writer, snapshot)?;
        writer.flush()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Reads a snapshot written by `write_snapshot`.
pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use tempfile::TempDir;

    fn persisted(key: &str, created_at: DateTime<Utc>, ttl: Option<u64>) -> PersistedEntry {
        PersistedEntry {
            key: key.to_string(),
            value: CacheValue::from("v"),
            created_at,
            last_accessed_at: created_at,
            access_count: 3,
            ttl_seconds: ttl,
            last_access_tick: 4,
            inserted_tick: 1,
        }
    }

    #[test]
    fn test_write_then_read_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("snap.json");
        let snapshot = Snapshot {
            saved_at: Utc::now(),
            entries: vec![persisted("a", Utc::now(), Some(60))],
            stats: CacheStats {
                hits: 2,
                misses: 1,
                evictions: 0,
                access_time_total_ms: 0.5,
            },
        };

        write_snapshot(&path, &snapshot).unwrap();
        let loaded = read_snapshot(&path).unwrap();

        assert_eq!(loaded.entries, snapshot.entries);
        assert_eq!(loaded.stats, snapshot.stats);
        assert!(!dir.path().join("nested").join("snap.json.tmp").exists());
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = read_snapshot(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(CacheError::Io(_))));
    }

    #[test]
    fn test_read_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.json");
        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(read_snapshot(&path), Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_wall_clock_expiry() {
        let now = Utc::now();
        let old = persisted("old", now - chrono::Duration::seconds(120), Some(60));
        let fresh = persisted("fresh", now - chrono::Duration::seconds(10), Some(60));
        let defaulted = persisted("defaulted", now - chrono::Duration::seconds(120), None);

        assert!(old.is_expired_at(now, 300));
        assert!(!fresh.is_expired_at(now, 300));
        assert!(!defaulted.is_expired_at(now, 300));
    }

    #[test]
    fn test_clock_pair_preserves_age() {
        let clock = ClockPair::now();
        let wall = clock.wall - chrono::Duration::milliseconds(1500);
        let instant = clock.to_instant(wall);

        let age = clock.instant.duration_since(instant);
        assert_eq!(age, Duration::from_millis(1500));
        assert_eq!(clock.to_wall(instant), wall);
    }
}
