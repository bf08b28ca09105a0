//! Cache Value Module
//!
//! The closed set of payload shapes the cache can hold: embeddings, search
//! results, profiles and anything else expressible as nested maps and lists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// == Cache Value ==
/// A cached payload.
///
/// Maps use `BTreeMap` so that serialization is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CacheValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Dense numeric array, typically an embedding
    Vector(Vec<f32>),
    List(Vec<CacheValue>),
    Map(BTreeMap<String, CacheValue>),
}

impl CacheValue {
    /// Returns the text if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CacheValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the array if this is a `Vector` value.
    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            CacheValue::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the map if this is a `Map` value.
    pub fn as_map(&self) -> Option<&BTreeMap<String, CacheValue>> {
        match self {
            CacheValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns true if every float reachable from this value is finite.
    ///
    /// JSON has no representation for NaN or infinity, so such values cannot
    /// be stored.
    pub fn is_finite(&self) -> bool {
        match self {
            CacheValue::Float(f) => f.is_finite(),
            CacheValue::Vector(v) => v.iter().all(|f| f.is_finite()),
            CacheValue::List(items) => items.iter().all(CacheValue::is_finite),
            CacheValue::Map(map) => map.values().all(CacheValue::is_finite),
            CacheValue::Null | CacheValue::Bool(_) | CacheValue::Int(_) | CacheValue::Text(_) => {
                true
            }
        }
    }
}

impl From<&str> for CacheValue {
    fn from(s: &str) -> Self {
        CacheValue::Text(s.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(s: String) -> Self {
        CacheValue::Text(s)
    }
}

impl From<Vec<f32>> for CacheValue {
    fn from(v: Vec<f32>) -> Self {
        CacheValue::Vector(v)
    }
}

impl From<f64> for CacheValue {
    fn from(f: f64) -> Self {
        CacheValue::Float(f)
    }
}

impl From<i64> for CacheValue {
    fn from(i: i64) -> Self {
        CacheValue::Int(i)
    }
}

impl From<bool> for CacheValue {
    fn from(b: bool) -> Self {
        CacheValue::Bool(b)
    }
}

impl From<Vec<CacheValue>> for CacheValue {
    fn from(items: Vec<CacheValue>) -> Self {
        CacheValue::List(items)
    }
}

impl From<BTreeMap<String, CacheValue>> for CacheValue {
    fn from(map: BTreeMap<String, CacheValue>) -> Self {
        CacheValue::Map(map)
    }
}
