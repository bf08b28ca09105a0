//! Cache Store Module
//!
//! Main cache engine: a key → entry table behind a single mutex, with size
//! budget enforcement through the configured eviction policy, TTL expiry,
//! transparent encoding and snapshot persistence.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cache::persistence::{
    read_snapshot, snapshot_path, write_snapshot, ClockPair, PersistedEntry, Snapshot,
};
use crate::cache::stats::Occupancy;
use crate::cache::{
    AdaptivePolicy, CacheEntry, CacheStats, CacheValue, EvictionPolicy, StatsSnapshot, ValueCodec,
    MAX_KEY_LENGTH,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Store State ==
/// Everything guarded by the store mutex.
#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<String, CacheEntry>,
    /// Always equal to the sum of `size_bytes` over `entries`
    current_size_bytes: u64,
    stats: CacheStats,
    /// Logical access clock
    clock: u64,
    /// (hot, cold) counts from the last `optimize_now`
    classification: Option<(usize, usize)>,
}

impl StoreState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.current_size_bytes -= entry.size_bytes;
        Some(entry)
    }

    fn insert(&mut self, key: String, entry: CacheEntry) {
        self.current_size_bytes += entry.size_bytes;
        if let Some(old) = self.entries.insert(key, entry) {
            self.current_size_bytes -= old.size_bytes;
        }
    }

    /// Evicts in policy order until `incoming` more bytes fit or nothing is left.
    ///
    /// Expired entries are reaped first; they never count as evictions.
    fn make_room(
        &mut self,
        incoming: u64,
        max_size_bytes: u64,
        default_ttl_seconds: u64,
        policy: &dyn EvictionPolicy,
    ) {
        if self.current_size_bytes + incoming <= max_size_bytes {
            return;
        }
        let reaped = self.reap_expired(default_ttl_seconds);
        if reaped > 0 {
            debug!("Reaped {} expired entries before eviction", reaped);
        }
        if self.current_size_bytes + incoming <= max_size_bytes {
            return;
        }

        let victims = policy.victim_order(&self.entries, Instant::now());
        for key in victims {
            if self.current_size_bytes + incoming <= max_size_bytes {
                break;
            }
            if let Some(evicted) = self.remove(&key) {
                self.stats.record_eviction();
                debug!(
                    "Evicted '{}' ({} bytes) under {} policy",
                    key,
                    evicted.size_bytes,
                    policy.strategy()
                );
            }
        }

        if self.current_size_bytes + incoming > max_size_bytes {
            debug!(
                "Item of {} bytes exceeds the remaining budget after eviction, storing anyway",
                incoming
            );
        }
    }

    fn reap_expired(&mut self, default_ttl_seconds: u64) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now, default_ttl_seconds))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }
}

// == Cache Store ==
/// Thread-safe, size-bounded cache of `CacheValue`s.
///
/// Share it between threads with `Arc<CacheStore>`; every method takes `&self`.
pub struct CacheStore {
    state: Mutex<StoreState>,
    policy: Box<dyn EvictionPolicy>,
    codec: ValueCodec,
    config: CacheConfig,
    max_size_bytes: u64,
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("strategy", &self.policy.strategy())
            .field("max_size_bytes", &self.max_size_bytes)
            .field("compression", &self.codec.compression_enabled())
            .finish_non_exhaustive()
    }
}

impl CacheStore {
    // == Constructor ==
    /// Creates a store, loading the persisted snapshot when persistence is on.
    ///
    /// Fails only on invalid configuration; an unreadable snapshot yields an
    /// empty store.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let compression_level = config.enable_compression.then_some(config.compression_level);
        let store = Self {
            state: Mutex::new(StoreState::default()),
            policy: config.cache_strategy.policy(),
            codec: ValueCodec::new(compression_level),
            max_size_bytes: config.max_size_bytes(),
            config,
        };

        if store.config.enable_persistence {
            store.load();
        }
        Ok(store)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    // == Put ==
    /// Stores a value, replacing any existing entry for the key.
    ///
    /// Evicts per the configured strategy when the budget would be exceeded.
    /// A single item larger than the budget is still stored. Returns `false`
    /// only when the key is malformed or the value cannot be encoded, in which
    /// case the store is unchanged.
    pub fn put(&self, key: &str, value: &CacheValue, ttl_seconds: Option<u64>) -> bool {
        match self.try_put(key, value, ttl_seconds) {
            Ok(()) => true,
            Err(e) => {
                warn!("Cache put for '{}' rejected: {}", key, e);
                false
            }
        }
    }

    fn try_put(&self, key: &str, value: &CacheValue, ttl_seconds: Option<u64>) -> Result<()> {
        validate_key(key)?;
        let stored = self.codec.encode(value)?;

        let mut state = self.state.lock();
        // The replaced entry's bytes are released before the budget check
        state.remove(key);
        state.make_room(
            stored.len() as u64,
            self.max_size_bytes,
            self.config.default_ttl_seconds,
            self.policy.as_ref(),
        );

        let tick = state.tick();
        state.insert(key.to_string(), CacheEntry::new(stored, ttl_seconds, tick));
        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Missing, expired and malformed keys count as misses; expired entries
    /// are removed on the way.
    pub fn get(&self, key: &str) -> Option<CacheValue> {
        let started = Instant::now();
        let mut state = self.state.lock();

        let value = self.lookup(&mut state, key);
        match value {
            Some(_) => state.stats.record_hit(),
            None => state.stats.record_miss(),
        }
        state.stats.record_access_time(started.elapsed());
        value
    }

    fn lookup(&self, state: &mut StoreState, key: &str) -> Option<CacheValue> {
        if validate_key(key).is_err() {
            return None;
        }

        let expired = state
            .entries
            .get(key)?
            .is_expired(self.config.default_ttl_seconds);
        if expired {
            state.remove(key);
            debug!("Entry '{}' expired on access", key);
            return None;
        }

        let tick = state.tick();
        let entry = state.entries.get_mut(key)?;
        match self.codec.decode(&entry.stored_value) {
            Ok(value) => {
                entry.record_access(tick);
                Some(value)
            }
            Err(e) => {
                warn!("Dropping undecodable entry '{}': {}", key, e);
                state.remove(key);
                None
            }
        }
    }

    /// Returns the cached value or computes, stores and returns it.
    pub fn get_or_insert_with<F>(&self, key: &str, ttl_seconds: Option<u64>, compute: F) -> CacheValue
    where
        F: FnOnce() -> CacheValue,
    {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = compute();
        self.put(key, &value, ttl_seconds);
        value
    }

    // == Delete ==
    /// Removes an entry. Returns true if one was present.
    pub fn delete(&self, key: &str) -> bool {
        self.state.lock().remove(key).is_some()
    }

    // == Clear ==
    /// Removes every entry and resets all statistics.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        *state = StoreState::default();
        info!("Cache cleared");
    }

    /// Returns true if a live entry exists, without touching statistics.
    pub fn contains(&self, key: &str) -> bool {
        self.state
            .lock()
            .entries
            .get(key)
            .is_some_and(|e| !e.is_expired(self.config.default_ttl_seconds))
    }

    /// Number of entries currently held, including any not yet reaped.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Cleanup Expired ==
    /// Removes all expired entries and returns how many were removed.
    pub fn cleanup_expired_entries(&self) -> usize {
        let removed = self
            .state
            .lock()
            .reap_expired(self.config.default_ttl_seconds);
        if removed > 0 {
            debug!("Removed {} expired entries", removed);
        }
        removed
    }

    // == Optimize ==
    /// Reaps expired entries and recomputes the hot/cold classification.
    pub fn optimize_now(&self) {
        let mut state = self.state.lock();
        state.reap_expired(self.config.default_ttl_seconds);
        let (hot, cold) = AdaptivePolicy::classify(&state.entries, Instant::now());
        state.classification = Some((hot, cold));
        debug!(
            "Classified {} entries: {} hot, {} cold",
            state.entries.len(),
            hot,
            cold
        );
    }

    // == Stats ==
    /// Returns a consistent point-in-time report.
    ///
    /// Expired entries are reaped first so counts reflect live data. Hot/cold
    /// counts come from the last `optimize_now`, or are computed here if it
    /// has not run since the last clear or restore.
    pub fn get_stats(&self) -> StatsSnapshot {
        let mut state = self.state.lock();
        state.reap_expired(self.config.default_ttl_seconds);

        let (hot_entries, cold_entries) = state
            .classification
            .unwrap_or_else(|| AdaptivePolicy::classify(&state.entries, Instant::now()));

        StatsSnapshot::build(
            &state.stats,
            Occupancy {
                entry_count: state.entries.len(),
                size_bytes: state.current_size_bytes,
                max_size_bytes: self.max_size_bytes,
                hot_entries,
                cold_entries,
                strategy: self.policy.strategy(),
                compression_enabled: self.config.enable_compression,
                persistence_enabled: self.config.enable_persistence,
            },
        )
    }

    // == Persistence ==
    /// Writes live entries to the snapshot file under `cache_dir`.
    ///
    /// Returns false when persistence is disabled or the write fails.
    pub fn save(&self) -> bool {
        let Some(path) = self.snapshot_file() else {
            return false;
        };
        match self.write_to(&path) {
            Ok(count) => {
                info!("Saved {} entries to {}", count, path.display());
                true
            }
            Err(e) => {
                warn!("Failed to save cache snapshot to {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Replaces entries with those in the snapshot under `cache_dir`,
    /// skipping any that have since expired. Statistics are left alone.
    ///
    /// Returns true if a snapshot was loaded.
    pub fn load(&self) -> bool {
        let Some(path) = self.snapshot_file() else {
            return false;
        };
        if !path.exists() {
            debug!("No cache snapshot at {}", path.display());
            return false;
        }
        match self.read_from(&path, false) {
            Ok(count) => {
                info!("Loaded {} entries from {}", count, path.display());
                true
            }
            Err(e) => {
                warn!("Failed to load cache snapshot from {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Writes entries and statistics to an arbitrary path.
    pub fn backup(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.write_to(path) {
            Ok(count) => {
                info!("Backed up {} entries to {}", count, path.display());
                true
            }
            Err(e) => {
                warn!("Cache backup to {} failed: {}", path.display(), e);
                false
            }
        }
    }

    /// Replaces entries and statistics with a backup's contents.
    ///
    /// On failure the store is left untouched.
    pub fn restore(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.read_from(path, true) {
            Ok(count) => {
                info!("Restored {} entries from {}", count, path.display());
                true
            }
            Err(e) => {
                warn!("Cache restore from {} failed: {}", path.display(), e);
                false
            }
        }
    }

    /// Flushes a final snapshot when persistence is enabled.
    pub fn shutdown(&self) {
        if self.config.enable_persistence {
            self.save();
        }
    }

    fn snapshot_file(&self) -> Option<PathBuf> {
        if !self.config.enable_persistence {
            return None;
        }
        self.config.cache_dir.as_deref().map(snapshot_path)
    }

    fn write_to(&self, path: &Path) -> Result<usize> {
        let state = self.state.lock();
        let clock = ClockPair::now();

        let mut entries = Vec::with_capacity(state.entries.len());
        for (key, entry) in &state.entries {
            if entry.is_expired_at(clock.instant, self.config.default_ttl_seconds) {
                continue;
            }
            let value = self.codec.decode(&entry.stored_value)?;
            entries.push(PersistedEntry::capture(key, value, entry, &clock));
        }

        let snapshot = Snapshot {
            saved_at: clock.wall,
            entries,
            stats: state.stats.clone(),
        };
        write_snapshot(path, &snapshot)?;
        Ok(snapshot.entries.len())
    }

    fn read_from(&self, path: &Path, with_stats: bool) -> Result<usize> {
        let mut state = self.state.lock();
        let snapshot = read_snapshot(path)?;
        let clock = ClockPair::now();

        let mut rebuilt = StoreState {
            stats: if with_stats {
                snapshot.stats
            } else {
                state.stats.clone()
            },
            ..StoreState::default()
        };

        for persisted in snapshot.entries {
            if persisted.is_expired_at(clock.wall, self.config.default_ttl_seconds) {
                continue;
            }
            let stored = match self.codec.encode(&persisted.value) {
                Ok(stored) => stored,
                Err(e) => {
                    return Err(CacheError::Snapshot(format!(
                        "entry '{}' cannot be encoded: {}",
                        persisted.key, e
                    )))
                }
            };
            rebuilt.clock = rebuilt
                .clock
                .max(persisted.last_access_tick)
                .max(persisted.inserted_tick);
            let key = persisted.key.clone();
            rebuilt.insert(key, persisted.into_entry(stored, &clock));
        }

        // A snapshot from a larger store may not fit this budget
        rebuilt.make_room(
            0,
            self.max_size_bytes,
            self.config.default_ttl_seconds,
            self.policy.as_ref(),
        );

        let count = rebuilt.entries.len();
        *state = rebuilt;
        Ok(count)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key is empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
