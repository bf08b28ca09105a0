//! Error types for the cache
//!
//! Provides unified error handling using thiserror. None of these errors
//! reach callers of the bool/Option cache surface; they are logged and
//! degraded to a miss or a no-op at that boundary.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Value could not be serialized or deserialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression or decompression failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// Value contains NaN or an infinite float
    #[error("Value contains a non-finite number")]
    NonFiniteNumber,

    /// File system failure during persistence
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration rejected at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Key is empty or too long
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Snapshot file is structurally unusable
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CacheError = io.into();
        assert!(matches!(err, CacheError::Io(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_serde_error_converts() {
        let parse = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: CacheError = parse.into();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
