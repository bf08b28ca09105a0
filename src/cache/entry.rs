//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support and
//! the access bookkeeping the eviction strategies rank on.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single stored value with its metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Encoded (possibly compressed) value
    pub stored_value: Vec<u8>,
    /// Length of `stored_value`, counted against the size budget
    pub size_bytes: u64,
    /// Creation time
    pub created_at: Instant,
    /// Time of the last successful `get` (or creation)
    pub last_accessed_at: Instant,
    /// Store clock reading at the last access; strictly increasing across the store
    pub last_access_tick: u64,
    /// Store clock reading at insertion, the tie-breaker for recency ordering
    pub inserted_tick: u64,
    /// Number of successful `get`s
    pub access_count: u64,
    /// TTL override in seconds, None = store default
    pub ttl_seconds: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry around an already encoded value.
    ///
    /// # Arguments
    /// * `stored_value` - Encoded bytes
    /// * `ttl_seconds` - Optional TTL override in seconds
    /// * `tick` - Current store clock reading
    pub fn new(stored_value: Vec<u8>, ttl_seconds: Option<u64>, tick: u64) -> Self {
        let now = Instant::now();
        Self {
            size_bytes: stored_value.len() as u64,
            stored_value,
            created_at: now,
            last_accessed_at: now,
            last_access_tick: tick,
            inserted_tick: tick,
            access_count: 0,
            ttl_seconds,
        }
    }

    /// Effective TTL given the store default.
    pub fn ttl(&self, default_ttl_seconds: u64) -> Duration {
        Duration::from_secs(self.ttl_seconds.unwrap_or(default_ttl_seconds))
    }

    // == Is Expired ==
    /// Checks if the entry has outlived its TTL.
    ///
    /// An entry is expired once its age is strictly greater than the TTL.
    pub fn is_expired(&self, default_ttl_seconds: u64) -> bool {
        self.is_expired_at(Instant::now(), default_ttl_seconds)
    }

    pub fn is_expired_at(&self, now: Instant, default_ttl_seconds: u64) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl(default_ttl_seconds)
    }

    // == Record Access ==
    /// Updates bookkeeping for a successful read.
    pub fn record_access(&mut self, tick: u64) {
        self.access_count += 1;
        self.last_accessed_at = Instant::now();
        self.last_access_tick = tick;
    }

    /// Time since the last access.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_accessed_at)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new(vec![0, 1, 2, 3], None, 7);

        assert_eq!(entry.size_bytes, 4);
        assert_eq!(entry.access_count, 0);
        assert_eq!(entry.last_access_tick, 7);
        assert_eq!(entry.inserted_tick, 7);
        assert!(!entry.is_expired(300));
    }

    #[test]
    fn test_entry_expiration_override() {
        // Create entry with 1 second TTL
        let entry = CacheEntry::new(vec![0], Some(1), 0);

        assert!(!entry.is_expired(300));

        // Wait for expiration
        sleep(Duration::from_millis(1100));

        assert!(entry.is_expired(300));
    }

    #[test]
    fn test_entry_uses_default_ttl() {
        let entry = CacheEntry::new(vec![0], None, 0);
        let later = entry.created_at + Duration::from_secs(11);

        assert!(entry.is_expired_at(later, 10));
        assert!(!entry.is_expired_at(later, 20));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new(vec![0], Some(5), 0);

        // Exactly at the TTL the entry is still live
        assert!(!entry.is_expired_at(entry.created_at + Duration::from_secs(5), 300));
        assert!(entry.is_expired_at(entry.created_at + Duration::from_millis(5001), 300));
    }

    #[test]
    fn test_record_access() {
        let mut entry = CacheEntry::new(vec![0], None, 1);
        entry.record_access(5);
        entry.record_access(9);

        assert_eq!(entry.access_count, 2);
        assert_eq!(entry.last_access_tick, 9);
        assert_eq!(entry.inserted_tick, 1);
    }
}
