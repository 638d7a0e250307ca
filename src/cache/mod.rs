//! Persistent cache service.
//!
//! Values are stored inside a [`CacheEnvelope`] carrying the schema version
//! of the value type and an optional expiry. A stored entry whose version
//! differs from the reader's, that has expired, or that cannot be decoded is
//! a miss: it is logged, removed, and never handed to the caller.

mod file;
mod memory;

use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache_error::{CacheError, Result};

pub use file::FileCacheStore;
pub use memory::MemoryCacheStore;

/// A value that can be persisted through [`CacheService`].
///
/// Bump `SCHEMA_VERSION` whenever the serialized shape changes; entries
/// written with another version are discarded on read.
pub trait Cacheable: Serialize + DeserializeOwned {
    const SCHEMA_VERSION: u32;
}

/// On-disk wrapper around a cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEnvelope {
    pub schema_version: u32,
    pub written_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub value: serde_json::Value,
}

impl CacheEnvelope {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }
}

/// Storage backend for cache envelopes. Writes replace the whole entry.
pub trait CacheStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<CacheEnvelope>>;

    fn store(&self, key: &str, envelope: &CacheEnvelope) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Cache keys are restricted to ASCII alphanumerics, `-` and `_` so they can
/// be used as file names unchanged.
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(key.to_string()))
    }
}

/// Typed `get`/`put`/`remove` over a [`CacheStore`].
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn CacheStore>,
}

impl CacheService {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// In-process cache, for embedding without a writable cache directory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()))
    }

    /// Read `key`, treating every kind of unusable entry as a miss.
    pub fn get<T: Cacheable>(&self, key: &str) -> Option<T> {
        self.get_at(key, Timestamp::now())
    }

    fn get_at<T: Cacheable>(&self, key: &str, now: Timestamp) -> Option<T> {
        let envelope = match self.store.load(key) {
            Ok(Some(envelope)) => envelope,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Discarding unreadable cache entry '{key}': {e}");
                self.discard(key);
                return None;
            }
        };

        if envelope.schema_version != T::SCHEMA_VERSION {
            let mismatch = CacheError::VersionMismatch {
                key: key.to_string(),
                expected: T::SCHEMA_VERSION,
                found: envelope.schema_version,
            };
            tracing::debug!("Cache miss: {mismatch}");
            self.discard(key);
            return None;
        }

        if envelope.is_expired(now) {
            tracing::debug!("Cache miss: entry '{key}' expired");
            self.discard(key);
            return None;
        }

        match serde_json::from_value(envelope.value) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Discarding undecodable cache entry '{key}': {e}");
                self.discard(key);
                None
            }
        }
    }

    /// Replace the entry for `key`. With a `ttl` the entry expires after
    /// that long; without one it lives until overwritten.
    pub fn put<T: Cacheable>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        self.put_at(key, value, ttl, Timestamp::now())
    }

    fn put_at<T: Cacheable>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        now: Timestamp,
    ) -> Result<()> {
        validate_key(key)?;
        let envelope = CacheEnvelope {
            schema_version: T::SCHEMA_VERSION,
            written_at: now,
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl).ok()),
            value: serde_json::to_value(value)?,
        };
        self.store.store(key, &envelope)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(key)
    }

    fn discard(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            tracing::warn!("Failed to remove cache entry '{key}': {e}");
        }
    }
}
