//! Integration Tests for the Cache
//!
//! Exercises the public API end to end: eviction strategies under budget
//! pressure, TTL expiry, compression, persistence, backup/restore and
//! concurrent access.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::{self, sleep};
use std::time::Duration;

use embedding_cache::{CacheConfig, CacheKeyBuilder, CacheStore, CacheStrategy, CacheValue};
use tempfile::TempDir;

// == Helper Functions ==

fn create_store(strategy: CacheStrategy, max_cache_size_mb: f64, compression: bool) -> CacheStore {
    CacheStore::new(CacheConfig {
        max_cache_size_mb,
        cache_strategy: strategy,
        default_ttl_seconds: 300,
        enable_compression: compression,
        ..CacheConfig::default()
    })
    .unwrap()
}

fn persistent_config(dir: &TempDir) -> CacheConfig {
    CacheConfig {
        enable_persistence: true,
        cache_dir: Some(dir.path().to_path_buf()),
        ..CacheConfig::default()
    }
}

/// Roughly 150 KB of JSON per array, distinct per seed and hard to compress
fn embedding(seed: u32) -> CacheValue {
    CacheValue::Vector(
        (0..15_000u32)
            .map(|j| (seed * 15_000 + j) as f32 + 0.25)
            .collect(),
    )
}

/// Text whose uncompressed stored size is `len + 12` bytes
fn text(len: usize) -> CacheValue {
    CacheValue::Text("x".repeat(len))
}

fn profile(id: i64) -> CacheValue {
    let mut map = BTreeMap::new();
    map.insert("id".to_string(), CacheValue::Int(id));
    map.insert("segment".to_string(), CacheValue::from("urban-25-34"));
    map.insert(
        "weights".to_string(),
        CacheValue::List(vec![CacheValue::Float(0.5), CacheValue::Float(0.25)]),
    );
    map.insert("centroid".to_string(), CacheValue::Vector(vec![0.125; 64]));
    CacheValue::Map(map)
}

// == Eviction Scenarios ==

#[test]
fn test_one_megabyte_lru_scenario() {
    let store = create_store(CacheStrategy::Lru, 1.0, false);

    for i in 0..10 {
        assert!(store.put(&format!("array_{}", i), &embedding(i), None));
    }

    let stats = store.get_stats();
    assert!(stats.evictions > 0);
    assert!(stats.entry_count < 10);
    assert!(stats.size_bytes <= store.max_size_bytes());
    assert_eq!(store.get("array_9"), Some(embedding(9)));
    assert_eq!(store.get("array_0"), None);
}

#[test]
fn test_lru_evicts_least_recently_used() {
    let store = create_store(CacheStrategy::Lru, 0.001, false);

    store.put("a", &text(300), None);
    store.put("b", &text(300), None);
    store.put("c", &text(300), None);
    store.get("a");
    store.get("b");

    store.put("d", &text(300), None);

    assert!(store.contains("a"));
    assert!(store.contains("b"));
    assert!(!store.contains("c"));
    assert!(store.contains("d"));
}

#[test]
fn test_lfu_evicts_least_frequently_used() {
    let store = create_store(CacheStrategy::Lfu, 0.001, false);

    store.put("a", &text(300), None);
    store.put("b", &text(300), None);
    store.put("c", &text(300), None);
    for _ in 0..3 {
        store.get("a");
    }
    store.get("b");
    store.get("b");
    store.get("c");

    store.put("d", &text(300), None);

    assert!(store.contains("a"));
    assert!(store.contains("b"));
    assert!(!store.contains("c"), "least frequently read entry should go first");
}

#[test]
fn test_adaptive_hot_entry_survives_pressure() {
    let store = create_store(CacheStrategy::Adaptive, 0.001, false);

    store.put("hot", &text(88), None);
    for _ in 0..10 {
        store.get("hot");
    }

    for i in 0..30 {
        store.put(&format!("cold_{}", i), &text(88), None);
    }

    let stats = store.get_stats();
    assert!(stats.evictions >= 20);
    assert_eq!(store.get("hot"), Some(text(88)));
}

#[test]
fn test_adaptive_prefers_large_cold_entry() {
    let store = create_store(CacheStrategy::Adaptive, 0.001, false);

    store.put("small_cold", &text(88), None);
    store.put("large_cold", &text(588), None);

    store.put("incoming", &text(388), None);

    assert!(store.contains("small_cold"));
    assert!(!store.contains("large_cold"));
    assert!(store.contains("incoming"));
    assert_eq!(store.get_stats().evictions, 1);
}

#[test]
fn test_adaptive_classification_after_optimize() {
    let store = create_store(CacheStrategy::Adaptive, 1.0, false);

    store.put("hot", &text(10), None);
    for _ in 0..25 {
        store.get("hot");
    }
    store.put("cold", &text(5000), None);

    store.optimize_now();

    let stats = store.get_stats();
    assert_eq!(stats.hot_entries, 1);
    assert_eq!(stats.cold_entries, 1);
}

// == TTL ==

#[test]
fn test_ttl_scenario() {
    let store = create_store(CacheStrategy::Lru, 1.0, true);

    store.put("k", &CacheValue::from("v"), Some(1));
    assert_eq!(store.get("k"), Some(CacheValue::from("v")));

    sleep(Duration::from_millis(1100));

    assert_eq!(store.get("k"), None);
    assert_eq!(store.get_stats().entry_count, 0);
}

#[test]
fn test_default_ttl_applies_without_override() {
    let store = CacheStore::new(CacheConfig {
        default_ttl_seconds: 1,
        ..CacheConfig::default()
    })
    .unwrap();

    store.put("defaulted", &CacheValue::from("v"), None);
    store.put("overridden", &CacheValue::from("v"), Some(60));

    sleep(Duration::from_millis(1100));

    assert_eq!(store.cleanup_expired_entries(), 1);
    assert!(store.contains("overridden"));
    assert!(!store.contains("defaulted"));
}

// == Statistics ==

#[test]
fn test_clear_resets_statistics() {
    let store = create_store(CacheStrategy::Lru, 0.001, false);
    for i in 0..6 {
        store.put(&format!("k{}", i), &text(300), None);
        store.get(&format!("k{}", i));
    }
    store.get("missing");
    assert!(store.get_stats().evictions > 0);

    store.clear();

    let stats = store.get_stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.evictions, 0);
    assert_eq!(stats.entry_count, 0);
    assert_eq!(stats.size_bytes, 0);
    assert_eq!(stats.hit_rate, 0.0);
}

#[test]
fn test_stats_echo_configuration() {
    let store = create_store(CacheStrategy::Lfu, 2.0, true);
    store.put("k", &text(1000), None);

    let stats = store.get_stats();
    assert_eq!(stats.cache_strategy, CacheStrategy::Lfu);
    assert_eq!(stats.max_size_mb, 2.0);
    assert!(stats.compression_enabled);
    assert!(!stats.persistence_enabled);
    assert!(stats.cache_utilization > 0.0);
    assert_eq!(
        stats.memory_usage_mb,
        stats.size_bytes as f64 / (1024.0 * 1024.0)
    );
}

// == Compression ==

#[test]
fn test_compression_reduces_memory_usage() {
    let plain = create_store(CacheStrategy::Adaptive, 50.0, false);
    let compressed = create_store(CacheStrategy::Adaptive, 50.0, true);

    let dataset: Vec<(String, CacheValue)> = (0..20)
        .map(|i| {
            let value = match i % 3 {
                0 => CacheValue::Vector((0..2000).map(|j| (j % 32) as f32 * 0.125).collect()),
                1 => CacheValue::from("neighbour list for query ".repeat(100)),
                _ => profile(i),
            };
            (format!("item_{}", i), value)
        })
        .collect();

    for (key, value) in &dataset {
        assert!(plain.put(key, value, None));
        assert!(compressed.put(key, value, None));
    }

    assert!(compressed.get_stats().memory_usage_mb < plain.get_stats().memory_usage_mb);
    for (key, value) in &dataset {
        assert_eq!(plain.get(key).as_ref(), Some(value));
        assert_eq!(compressed.get(key).as_ref(), Some(value));
    }
}

// == Persistence ==

#[test]
fn test_save_and_load_across_instances() {
    let dir = TempDir::new().unwrap();
    {
        let store = CacheStore::new(persistent_config(&dir)).unwrap();
        store.put("embedding", &embedding(1), None);
        store.put("profile", &profile(7), Some(600));
        assert!(store.save());
    }

    let reloaded = CacheStore::new(persistent_config(&dir)).unwrap();
    assert_eq!(reloaded.get("embedding"), Some(embedding(1)));
    assert_eq!(reloaded.get("profile"), Some(profile(7)));
    assert!(reloaded.get_stats().persistence_enabled);
}

#[test]
fn test_load_skips_entries_expired_since_save() {
    let dir = TempDir::new().unwrap();
    {
        let store = CacheStore::new(persistent_config(&dir)).unwrap();
        store.put("short", &CacheValue::from("v"), Some(1));
        store.put("long", &CacheValue::from("v"), Some(600));
        store.shutdown();
    }

    sleep(Duration::from_millis(1100));

    let reloaded = CacheStore::new(persistent_config(&dir)).unwrap();
    assert!(!reloaded.contains("short"));
    assert!(reloaded.contains("long"));
}

#[test]
fn test_corrupt_snapshot_yields_empty_store() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(embedding_cache::cache::persistence::SNAPSHOT_FILE_NAME),
        b"definitely not a snapshot",
    )
    .unwrap();

    let store = CacheStore::new(persistent_config(&dir)).unwrap();
    assert!(store.is_empty());
    assert!(store.put("k", &CacheValue::from("v"), None));
}

#[test]
fn test_save_without_persistence_is_noop() {
    let store = create_store(CacheStrategy::Lru, 1.0, true);
    store.put("k", &CacheValue::from("v"), None);
    assert!(!store.save());
    assert!(!store.load());
}

#[test]
fn test_backup_restore_roundtrip() {
    let dir = TempDir::new().unwrap();
    let backup_path = dir.path().join("backups").join("cache.json");

    let original = create_store(CacheStrategy::Lfu, 0.01, true);
    for i in 0..20 {
        original.put(&format!("profile_{}", i), &profile(i), None);
    }
    original.put("text", &CacheValue::from("hello"), Some(600));
    original.get("profile_3");
    original.get("missing");
    let before = original.get_stats();

    assert!(original.backup(&backup_path));

    let restored = create_store(CacheStrategy::Lfu, 0.01, true);
    restored.put("stale", &CacheValue::from("replaced by restore"), None);
    assert!(restored.restore(&backup_path));

    let after = restored.get_stats();
    assert_eq!(after.hits, before.hits);
    assert_eq!(after.misses, before.misses);
    assert_eq!(after.evictions, before.evictions);
    assert_eq!(after.entry_count, before.entry_count);
    assert_eq!(after.size_bytes, before.size_bytes);

    assert!(!restored.contains("stale"));
    assert_eq!(restored.get("text"), Some(CacheValue::from("hello")));
    for i in 0..20 {
        let key = format!("profile_{}", i);
        assert_eq!(restored.get(&key), original.get(&key));
    }
}

#[test]
fn test_restore_missing_file_leaves_store_untouched() {
    let dir = TempDir::new().unwrap();
    let store = create_store(CacheStrategy::Lru, 1.0, true);
    store.put("k", &CacheValue::from("v"), None);
    store.get("k");

    assert!(!store.restore(dir.path().join("nope.json")));

    assert_eq!(store.get("k"), Some(CacheValue::from("v")));
    assert_eq!(store.get_stats().hits, 2);
}

#[test]
fn test_restore_corrupt_backup_leaves_store_untouched() {
    let dir = TempDir::new().unwrap();
    let backup_path = dir.path().join("backup.json");
    std::fs::write(&backup_path, b"{\"saved_at\": \"2024-01-01T00:00:00Z\", \"entries\": [").unwrap();

    let store = create_store(CacheStrategy::Lru, 1.0, true);
    store.put("k1", &CacheValue::from("v1"), None);
    store.put("k2", &embedding(7), None);
    store.get("k1");
    store.get("missing");
    let before = store.get_stats();

    assert!(!store.restore(&backup_path));

    let after = store.get_stats();
    assert_eq!(after.entry_count, before.entry_count);
    assert_eq!(after.size_bytes, before.size_bytes);
    assert_eq!(after.hits, before.hits);
    assert_eq!(after.misses, before.misses);
    assert_eq!(after.evictions, before.evictions);
    assert_eq!(store.get("k1"), Some(CacheValue::from("v1")));
    assert_eq!(store.get("k2"), Some(embedding(7)));
}

// == Keys and Read-Through ==

#[test]
fn test_generated_keys_drive_read_through() {
    let store = create_store(CacheStrategy::Adaptive, 1.0, true);
    let key = |k: u32| {
        CacheKeyBuilder::new()
            .namespace("search")
            .arg("red running shoes")
            .kwarg("k", k)
            .build()
    };

    let mut computed = 0;
    for _ in 0..3 {
        store.get_or_insert_with(&key(10), None, || {
            computed += 1;
            CacheValue::List(vec![CacheValue::Int(4), CacheValue::Int(8)])
        });
    }
    store.get_or_insert_with(&key(20), None, || {
        computed += 1;
        CacheValue::Null
    });

    assert_eq!(computed, 2);
    assert_eq!(store.get_stats().entry_count, 2);
}

// == Concurrency ==

#[test]
fn test_concurrent_access_keeps_accounting_consistent() {
    let store = Arc::new(create_store(CacheStrategy::Adaptive, 0.01, false));
    let threads = 8;
    let ops_per_thread = 200;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let key = format!("k{}", (t * 7 + i) % 50);
                    store.put(&key, &text(200 + (i % 5) * 50), None);
                    store.get(&key);
                    if i % 10 == 0 {
                        store.delete(&key);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stats = store.get_stats();
    assert_eq!(stats.hits + stats.misses, (threads * ops_per_thread) as u64);
    assert!(stats.size_bytes <= store.max_size_bytes());
    assert_eq!(stats.entry_count, store.len());
}
