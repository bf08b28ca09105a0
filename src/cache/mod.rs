//! Cache Module
//!
//! Size-bounded in-memory caching with TTL expiry, pluggable eviction,
//! transparent compression and snapshot persistence.

mod codec;
mod entry;
mod eviction;
mod keys;
pub mod persistence;
mod stats;
mod store;
mod value;


// Re-export public types
pub use codec::{Compressor, NoopCompressor, ValueCodec, ZstdCompressor};
pub use entry::CacheEntry;
pub use eviction::{
    AdaptivePolicy, CacheStrategy, EvictionPolicy, LfuPolicy, LruPolicy, COLD_THRESHOLD,
    HOT_THRESHOLD,
};
pub use keys::{generate_cache_key, CacheKeyBuilder};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::CacheStore;
pub use value::CacheValue;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 1024;
