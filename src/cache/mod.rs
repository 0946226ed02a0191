//! Result cache for the merged configuration
//!
//! A TTL-bounded key/value store the loader consults before running the
//! configuration pipeline. Adapters validate keys on their side: a key must
//! match `[A-Za-z0-9_.]{1,64}` or the operation fails with
//! `InvalidCacheKey`. The crate ships an in-memory adapter as the default;
//! hosts plug in anything else that satisfies [`CacheStore`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use crate::error::ModuleError;

/// Check a cache key against the `[A-Za-z0-9_.]{1,64}` pattern.
pub fn validate_key(key: &str) -> Result<(), ModuleError> {
    let valid = !key.is_empty()
        && key.len() <= 64
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(ModuleError::InvalidCacheKey(key.to_string()))
    }
}

/// Cache adapter contract: get/set/delete/has with TTL, plus batch
/// variants with default loop implementations.
pub trait CacheStore {
    fn get(&mut self, key: &str) -> Result<Option<Value>, ModuleError>;

    fn set(&mut self, key: &str, value: Value, ttl: Duration) -> Result<(), ModuleError>;

    fn delete(&mut self, key: &str) -> Result<(), ModuleError>;

    fn has(&mut self, key: &str) -> Result<bool, ModuleError>;

    fn get_many(&mut self, keys: &[&str]) -> Result<Vec<Option<Value>>, ModuleError> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    fn set_many(
        &mut self,
        entries: Vec<(String, Value)>,
        ttl: Duration,
    ) -> Result<(), ModuleError> {
        for (key, value) in entries {
            self.set(&key, value, ttl)?;
        }
        Ok(())
    }

    fn delete_many(&mut self, keys: &[&str]) -> Result<(), ModuleError> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }
}

struct CacheEntry {
    value: Value,
    // None when the TTL overflows Instant arithmetic: never expires.
    expires_at: Option<Instant>,
}

/// Map-backed default cache adapter with deadline-based expiry.
/// Expired entries read as misses and are evicted on access.
#[derive(Default)]
pub struct MemoryCache {
    entries: HashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict_if_expired(&mut self, key: &str) {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|e| e.expires_at.is_some_and(|at| at <= Instant::now()));
        if expired {
            debug!(key, "cache entry expired");
            self.entries.remove(key);
        }
    }
}

impl CacheStore for MemoryCache {
    fn get(&mut self, key: &str) -> Result<Option<Value>, ModuleError> {
        validate_key(key)?;
        self.evict_if_expired(key);
        Ok(self.entries.get(key).map(|e| e.value.clone()))
    }

    fn set(&mut self, key: &str, value: Value, ttl: Duration) -> Result<(), ModuleError> {
        validate_key(key)?;
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now().checked_add(ttl),
            },
        );
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), ModuleError> {
        validate_key(key)?;
        self.entries.remove(key);
        Ok(())
    }

    fn has(&mut self, key: &str) -> Result<bool, ModuleError> {
        validate_key(key)?;
        self.evict_if_expired(key);
        Ok(self.entries.contains_key(key))
    }
}
