//! Cache Key Module
//!
//! Derives stable cache keys from call arguments so that identical logical
//! requests share an entry no matter where they are issued from.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Hashes positional and keyword arguments into a hex key.
///
/// Keyword order does not matter; changing any argument value changes the key.
pub fn generate_cache_key(args: &[Value], kwargs: &BTreeMap<String, Value>) -> String {
    // serde_json objects are ordered maps, so this encoding is canonical
    let canonical = json!({ "args": args, "kwargs": kwargs });
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

// == Cache Key Builder ==
/// Accumulates arguments for `generate_cache_key`.
///
/// ```
/// use embedding_cache::cache::CacheKeyBuilder;
///
/// let key = CacheKeyBuilder::new()
///     .namespace("search")
///     .arg("query text")
///     .kwarg("k", 10)
///     .build();
/// assert!(key.starts_with("search:"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CacheKeyBuilder {
    namespace: Option<String>,
    args: Vec<Value>,
    kwargs: BTreeMap<String, Value>,
}

impl CacheKeyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefixes the key as `<namespace>:<hash>`.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Appends a positional argument. Unserializable arguments hash as null.
    pub fn arg(mut self, value: impl Serialize) -> Self {
        self.args.push(serde_json::to_value(value).unwrap_or(Value::Null));
        self
    }

    /// Sets a keyword argument, replacing any earlier value for the name.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        self.kwargs
            .insert(name.into(), serde_json::to_value(value).unwrap_or(Value::Null));
        self
    }

    pub fn build(&self) -> String {
        let hash = generate_cache_key(&self.args, &self.kwargs);
        match &self.namespace {
            Some(ns) => format!("{}:{}", ns, hash),
            None => hash,
        }
    }
}
