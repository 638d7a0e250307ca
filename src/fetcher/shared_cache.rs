//! Short-lived read-through cache shared by every surface that reads the
//! same collection query.
//!
//! Callers asking for the same key while a request is outstanding wait for
//! that request instead of issuing their own, then share its result. Only
//! successful results are stored; a failure is returned to the caller that
//! made the request and the next caller starts over.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::Result;
use crate::types::Issue;

struct CachedQuery {
    issues: Arc<[Issue]>,
    stored_at: Instant,
}

type Slot = Arc<Mutex<Option<CachedQuery>>>;

/// Read-through collection cache keyed by query parameters.
pub struct SharedQueryCache {
    ttl: Duration,
    slots: DashMap<String, Slot>,
}

impl SharedQueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached result for `key` if it is younger than the TTL,
    /// otherwise run `fetch` and store its result.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<Arc<[Issue]>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Issue>>>,
    {
        let slot: Slot = self.slots.entry(key.to_string()).or_default().clone();
        let mut cached = slot.lock().await;

        if let Some(entry) = cached.as_ref()
            && entry.stored_at.elapsed() < self.ttl
        {
            tracing::debug!("Shared cache hit for '{key}'");
            return Ok(Arc::clone(&entry.issues));
        }

        let issues: Arc<[Issue]> = fetch().await?.into();
        *cached = Some(CachedQuery {
            issues: Arc::clone(&issues),
            stored_at: Instant::now(),
        });
        Ok(issues)
    }

    /// Forget any stored result for `key`. An in-flight request is not
    /// affected.
    pub fn invalidate(&self, key: &str) {
        if let Some(slot) = self.slots.get(key)
            && let Ok(mut cached) = slot.try_lock()
        {
            *cached = None;
        }
    }
}
