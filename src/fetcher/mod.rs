//! Collection fetching.
//!
//! Every surface reads the same unfiltered collection and applies its own
//! projection. At this boundary a transport failure, an undecodable body and
//! a genuinely empty collection all come out as an empty [`Snapshot`]; the
//! failure is logged here and never reaches the surfaces as an error.

pub mod shared_cache;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use jiff::Timestamp;

use crate::api::{EXPLORE_PATH, IssueApi};
use crate::types::{Issue, IssueId};

pub use shared_cache::SharedQueryCache;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// The full issue collection as returned by one fetch. Immutable; replaced
/// wholesale by the next fetch.
#[derive(Debug, Clone)]
pub struct Snapshot {
    issues: Arc<[Issue]>,
    generation: u64,
    fetched_at: Option<Timestamp>,
    degraded: bool,
}

impl Snapshot {
    /// The state of a surface before its first fetch resolves.
    pub fn empty() -> Self {
        Self {
            issues: Arc::from(Vec::new()),
            generation: 0,
            fetched_at: None,
            degraded: false,
        }
    }

    fn fresh(issues: Arc<[Issue]>) -> Self {
        Self {
            issues,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            fetched_at: Some(Timestamp::now()),
            degraded: false,
        }
    }

    fn failed() -> Self {
        Self {
            degraded: true,
            ..Self::fresh(Arc::from(Vec::new()))
        }
    }

    /// Build a snapshot from already-fetched issues.
    pub fn from_issues(issues: Vec<Issue>) -> Self {
        Self::fresh(issues.into())
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn get(&self, id: &IssueId) -> Option<&Issue> {
        self.issues.iter().find(|issue| &issue.id == id)
    }

    /// Unique per fetch; 0 for [`Snapshot::empty`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn fetched_at(&self) -> Option<Timestamp> {
        self.fetched_at
    }

    /// True when this empty snapshot stands in for a failed fetch.
    ///
    /// Rendering must treat it exactly like an empty collection. Only
    /// write-back paths (the persisted sidebar entry) consult it, so that a
    /// failed fetch never overwrites data that was good.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

/// Reads the issue collection for a surface.
///
/// Cheap to clone; clones share the backend client and the shared cache.
#[derive(Clone)]
pub struct CollectionFetcher {
    api: Arc<dyn IssueApi>,
    shared: Option<Arc<SharedQueryCache>>,
}

impl CollectionFetcher {
    pub fn new(api: Arc<dyn IssueApi>) -> Self {
        Self { api, shared: None }
    }

    /// Route reads through a shared read-through cache so overlapping
    /// surfaces coalesce into one request.
    pub fn with_shared_cache(mut self, cache: Arc<SharedQueryCache>) -> Self {
        self.shared = Some(cache);
        self
    }

    pub fn api(&self) -> &Arc<dyn IssueApi> {
        &self.api
    }

    /// Fetch the collection, possibly served from the shared cache.
    ///
    /// Never fails and never retries.
    pub async fn fetch(&self) -> Snapshot {
        let result = match &self.shared {
            Some(cache) => cache.get_or_fetch(EXPLORE_PATH, || self.api.explore()).await,
            None => self.api.explore().await.map(Arc::from),
        };

        match result {
            Ok(issues) => {
                let snapshot = Snapshot::fresh(issues);
                tracing::debug!(
                    "Fetched {} issues (generation {})",
                    snapshot.len(),
                    snapshot.generation()
                );
                snapshot
            }
            Err(e) => {
                let kind = if e.is_transport() { "transport" } else { "decode" };
                tracing::warn!("Issue collection fetch failed ({kind}): {e}");
                Snapshot::failed()
            }
        }
    }

    /// Fetch bypassing any stored shared result. Used for user-initiated
    /// refreshes.
    pub async fn fetch_fresh(&self) -> Snapshot {
        if let Some(cache) = &self.shared {
            cache.invalidate(EXPLORE_PATH);
        }
        self.fetch().await
    }
}
