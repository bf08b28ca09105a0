//! Codec Module
//!
//! Serializes values to JSON and optionally compresses them with zstd.
//!
//! Stored layout is one format byte followed by the payload. Compression is
//! only kept when it actually shrinks the payload, so enabling it never
//! increases an entry's footprint.

use crate::cache::CacheValue;
use crate::error::{CacheError, Result};

const FORMAT_RAW: u8 = 0;
const FORMAT_ZSTD: u8 = 1;

// == Compressor Trait ==
/// A lossless byte transform.
pub trait Compressor: Send + Sync {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Pass-through compressor.
pub struct NoopCompressor;

impl Compressor for NoopCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// zstd compressor.
pub struct ZstdCompressor {
    level: i32,
}

impl ZstdCompressor {
    pub fn new() -> Self {
        Self { level: 3 }
    }

    pub fn with_level(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor for ZstdCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::encode_all(data, self.level)
            .map_err(|e| CacheError::Compression(format!("zstd compression failed: {}", e)))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::decode_all(data)
            .map_err(|e| CacheError::Compression(format!("zstd decompression failed: {}", e)))
    }
}

// == Value Codec ==
/// Encodes `CacheValue`s into the bytes held by the store and back.
pub struct ValueCodec {
    compressor: Option<ZstdCompressor>,
}

impl ValueCodec {
    /// Creates a codec; `None` disables compression.
    pub fn new(compression_level: Option<i32>) -> Self {
        Self {
            compressor: compression_level.map(ZstdCompressor::with_level),
        }
    }

    pub fn compression_enabled(&self) -> bool {
        self.compressor.is_some()
    }

    /// Serializes and, if enabled, compresses a value.
    pub fn encode(&self, value: &CacheValue) -> Result<Vec<u8>> {
        if !value.is_finite() {
            return Err(CacheError::NonFiniteNumber);
        }
        let serialized = serde_json::to_vec(value)?;

        if let Some(compressor) = &self.compressor {
            let compressed = compressor.compress(&serialized)?;
            if compressed.len() < serialized.len() {
                return Ok(framed(FORMAT_ZSTD, &compressed));
            }
        }
        Ok(framed(FORMAT_RAW, &serialized))
    }

    /// Reverses `encode`. Accepts either format regardless of configuration.
    pub fn decode(&self, stored: &[u8]) -> Result<CacheValue> {
        let (format, payload) = stored
            .split_first()
            .ok_or_else(|| CacheError::Compression("empty stored value".to_string()))?;

        let serialized = match *format {
            FORMAT_RAW => NoopCompressor.decompress(payload)?,
            FORMAT_ZSTD => ZstdCompressor::new().decompress(payload)?,
            other => {
                return Err(CacheError::Compression(format!(
                    "unknown stored format byte {}",
                    other
                )))
            }
        };
        Ok(serde_json::from_slice(&serialized)?)
    }
}

fn framed(format: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(format);
    out.extend_from_slice(payload);
    out
}
