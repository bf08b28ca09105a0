//! Eviction Policy Module
//!
//! Ranks live entries for removal when a put would exceed the size budget.
//! Every policy returns keys ordered most-evictable first; the store removes
//! them in that order until the new value fits, so each round makes progress
//! and terminates once the candidates run out.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::cache::CacheEntry;
use crate::error::CacheError;

/// Adaptive scores below this count as hot.
pub const HOT_THRESHOLD: f64 = 0.3;
/// Adaptive scores above this count as cold.
pub const COLD_THRESHOLD: f64 = 0.55;

const RECENCY_WEIGHT: f64 = 0.4;
const FREQUENCY_WEIGHT: f64 = 0.4;
const SIZE_WEIGHT: f64 = 0.2;
/// Idle time at which the recency term reaches one half.
const RECENCY_HALF_LIFE_SECS: f64 = 60.0;

// == Cache Strategy ==
/// Eviction strategy, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStrategy {
    Lru,
    Lfu,
    Adaptive,
}

impl CacheStrategy {
    /// Returns the policy implementing this strategy.
    pub fn policy(self) -> Box<dyn EvictionPolicy> {
        match self {
            CacheStrategy::Lru => Box::new(LruPolicy),
            CacheStrategy::Lfu => Box::new(LfuPolicy),
            CacheStrategy::Adaptive => Box::new(AdaptivePolicy),
        }
    }
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheStrategy::Lru => "LRU",
            CacheStrategy::Lfu => "LFU",
            CacheStrategy::Adaptive => "ADAPTIVE",
        };
        f.write_str(name)
    }
}

impl FromStr for CacheStrategy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(CacheStrategy::Lru),
            "lfu" => Ok(CacheStrategy::Lfu),
            "adaptive" => Ok(CacheStrategy::Adaptive),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown cache strategy '{}'",
                other
            ))),
        }
    }
}

// == Eviction Policy Trait ==
/// Orders entries for eviction.
pub trait EvictionPolicy: Send + Sync {
    fn strategy(&self) -> CacheStrategy;

    /// Returns every key, most evictable first.
    fn victim_order(&self, entries: &HashMap<String, CacheEntry>, now: Instant) -> Vec<String>;
}

// == LRU ==
/// Evicts the entry with the oldest access, oldest insertion first on ties.
#[derive(Debug, Default)]
pub struct LruPolicy;

impl EvictionPolicy for LruPolicy {
    fn strategy(&self) -> CacheStrategy {
        CacheStrategy::Lru
    }

    fn victim_order(&self, entries: &HashMap<String, CacheEntry>, _now: Instant) -> Vec<String> {
        let mut ranked: Vec<(&String, &CacheEntry)> = entries.iter().collect();
        ranked.sort_by_key(|(_, e)| (e.last_access_tick, e.inserted_tick));
        ranked.into_iter().map(|(k, _)| k.clone()).collect()
    }
}

// == LFU ==
/// Evicts the least frequently read entry, least recently used first on ties.
#[derive(Debug, Default)]
pub struct LfuPolicy;

impl EvictionPolicy for LfuPolicy {
    fn strategy(&self) -> CacheStrategy {
        CacheStrategy::Lfu
    }

    fn victim_order(&self, entries: &HashMap<String, CacheEntry>, _now: Instant) -> Vec<String> {
        let mut ranked: Vec<(&String, &CacheEntry)> = entries.iter().collect();
        ranked.sort_by_key(|(_, e)| (e.access_count, e.last_access_tick, e.inserted_tick));
        ranked.into_iter().map(|(k, _)| k.clone()).collect()
    }
}

// == Adaptive ==
/// Scores entries on recency, frequency and size together.
///
/// `score = 0.4 * recency + 0.4 / (access_count + 1) + 0.2 * size`, where
/// `recency = idle / (idle + 60s)` and size is stored bytes divided by the
/// largest entry among those scored. Every term lies in [0, 1] and higher
/// means more evictable.
#[derive(Debug, Default)]
pub struct AdaptivePolicy;

impl AdaptivePolicy {
    /// Scores every entry. Size is normalised against this set of entries.
    pub fn scores<'a>(
        entries: &'a HashMap<String, CacheEntry>,
        now: Instant,
    ) -> Vec<(&'a String, &'a CacheEntry, f64)> {
        let max_size = entries.values().map(|e| e.size_bytes).max().unwrap_or(0);

        entries
            .iter()
            .map(|(key, entry)| {
                let idle = entry.idle_for(now).as_secs_f64();
                let recency = idle / (idle + RECENCY_HALF_LIFE_SECS);
                let frequency = 1.0 / (entry.access_count as f64 + 1.0);
                let size = if max_size > 0 {
                    entry.size_bytes as f64 / max_size as f64
                } else {
                    0.0
                };
                let score =
                    RECENCY_WEIGHT * recency + FREQUENCY_WEIGHT * frequency + SIZE_WEIGHT * size;
                (key, entry, score)
            })
            .collect()
    }

    /// Counts (hot, cold) entries under the current scores.
    pub fn classify(entries: &HashMap<String, CacheEntry>, now: Instant) -> (usize, usize) {
        Self::scores(entries, now)
            .into_iter()
            .fold((0, 0), |(hot, cold), (_, _, score)| {
                if score < HOT_THRESHOLD {
                    (hot + 1, cold)
                } else if score > COLD_THRESHOLD {
                    (hot, cold + 1)
                } else {
                    (hot, cold)
                }
            })
    }
}

impl EvictionPolicy for AdaptivePolicy {
    fn strategy(&self) -> CacheStrategy {
        CacheStrategy::Adaptive
    }

    fn victim_order(&self, entries: &HashMap<String, CacheEntry>, now: Instant) -> Vec<String> {
        let mut ranked = Self::scores(entries, now);
        ranked.sort_by(|a, b| {
            b.2.total_cmp(&a.2)
                .then(a.1.last_access_tick.cmp(&b.1.last_access_tick))
        });
        ranked.into_iter().map(|(k, _, _)| k.clone()).collect()
    }
}
