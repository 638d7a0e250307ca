use dashmap::DashMap;

use super::{CacheEnvelope, CacheStore, validate_key};
use crate::cache_error::Result;

/// Process-local store; entries vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEnvelope>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self, key: &str) -> Result<Option<CacheEnvelope>> {
        validate_key(key)?;
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn store(&self, key: &str, envelope: &CacheEnvelope) -> Result<()> {
        validate_key(key)?;
        self.entries.insert(key.to_string(), envelope.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
