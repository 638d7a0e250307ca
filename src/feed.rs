//! Explore feed: active issues, searchable, revealed in batches as the user
//! scrolls.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::comments::CommentLoader;
use crate::engagement::{EngagementOverlay, EngagementReconciler};
use crate::fetcher::{CollectionFetcher, Snapshot};
use crate::pagination::{PaginationWindow, ProximityObserver};
use crate::projection::{ProjectionSpec, SearchFilter};
use crate::surface::{FetchGate, MountState, RefreshOutcome};
use crate::types::{Issue, IssueId};

/// A revealed issue merged with its local engagement state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedCard {
    pub issue: Issue,
    pub engagement: EngagementOverlay,
    pub comments_visible: bool,
}

struct FeedState {
    snapshot: Snapshot,
    query: String,
    projection: Vec<Issue>,
    window: PaginationWindow,
    observer: ProximityObserver,
}

impl FeedState {
    fn reproject(&mut self) {
        let spec = ProjectionSpec::feed().and(Box::new(SearchFilter::new(&self.query)));
        self.projection = spec.apply(self.snapshot.issues()).items;
        self.window.reset();
        self.observer.detach();
    }

    fn visible(&self) -> &[Issue] {
        self.window.slice(&self.projection)
    }
}

pub struct ExploreFeed {
    fetcher: CollectionFetcher,
    engagement: Arc<EngagementReconciler>,
    comments: Arc<CommentLoader>,
    gate: FetchGate,
    mount: MountState,
    state: Mutex<FeedState>,
}

impl ExploreFeed {
    pub fn new(
        fetcher: CollectionFetcher,
        engagement: Arc<EngagementReconciler>,
        comments: Arc<CommentLoader>,
        batch_size: usize,
    ) -> Self {
        Self {
            fetcher,
            engagement,
            comments,
            gate: FetchGate::new(),
            mount: MountState::new(),
            state: Mutex::new(FeedState {
                snapshot: Snapshot::empty(),
                query: String::new(),
                projection: Vec::new(),
                window: PaginationWindow::new(batch_size),
                observer: ProximityObserver::new(),
            }),
        }
    }

    pub fn engagement(&self) -> &Arc<EngagementReconciler> {
        &self.engagement
    }

    pub fn comments(&self) -> &Arc<CommentLoader> {
        &self.comments
    }

    /// Initial load; may be served by the shared collection cache.
    pub async fn load(&self) -> RefreshOutcome {
        self.run_fetch(false).await
    }

    /// User-initiated refresh; always goes to the backend.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.run_fetch(true).await
    }

    async fn run_fetch(&self, fresh: bool) -> RefreshOutcome {
        let Some(_permit) = self.gate.try_begin() else {
            tracing::debug!("Feed fetch already in flight; trigger dropped");
            return RefreshOutcome::Dropped;
        };
        let token = self.mount.token();

        let snapshot = if fresh {
            self.fetcher.fetch_fresh().await
        } else {
            self.fetcher.fetch().await
        };

        if !self.mount.is_current(token) {
            tracing::debug!("Feed unmounted during fetch; result discarded");
            return RefreshOutcome::Discarded;
        }

        let mut state = self.state.lock();
        self.engagement.reset(&snapshot);
        self.comments.clear();
        state.snapshot = snapshot;
        state.reproject();
        self.sync_revealed(&mut state);
        tracing::debug!(
            "Feed replaced snapshot (generation {}, {} matching)",
            state.snapshot.generation(),
            state.projection.len()
        );
        RefreshOutcome::Applied
    }

    /// Change the search text. The window always goes back to the first
    /// batch. Returns how many issues are now revealed.
    pub fn set_search_query(&self, query: &str) -> usize {
        let mut state = self.state.lock();
        state.query = query.to_string();
        state.reproject();
        self.sync_revealed(&mut state);
        state.visible().len()
    }

    pub fn query(&self) -> String {
        self.state.lock().query.clone()
    }

    /// Viewport signal: `id` scrolled into view. Reveals the next batch when
    /// it is the watched last item; ignored while a fetch is in flight.
    pub fn on_visible(&self, id: &IssueId) -> bool {
        if self.gate.is_busy() || !self.mount.is_mounted() {
            return false;
        }
        let mut state = self.state.lock();
        if !state.observer.signal(id) {
            return false;
        }
        let len = state.projection.len();
        let advanced = state.window.advance(len);
        self.sync_revealed(&mut state);
        advanced
    }

    pub fn visible(&self) -> Vec<Issue> {
        self.state.lock().visible().to_vec()
    }

    pub fn revealed_count(&self) -> usize {
        self.state.lock().visible().len()
    }

    /// Total issues matching the current query.
    pub fn matching_count(&self) -> usize {
        self.state.lock().projection.len()
    }

    /// Revealed issues with their overlays applied.
    pub fn cards(&self) -> Vec<FeedCard> {
        let state = self.state.lock();
        state
            .visible()
            .iter()
            .map(|issue| FeedCard {
                engagement: self
                    .engagement
                    .overlay(&issue.id)
                    .unwrap_or_else(|| EngagementOverlay::from_issue(issue)),
                comments_visible: self.comments.is_visible(&issue.id),
                issue: issue.clone(),
            })
            .collect()
    }

    /// "N issue(s) shown"
    pub fn shown_label(&self) -> String {
        let n = self.revealed_count();
        if n == 1 {
            "1 issue shown".to_string()
        } else {
            format!("{n} issues shown")
        }
    }

    pub fn is_loading(&self) -> bool {
        self.gate.is_busy()
    }

    pub fn watched_item(&self) -> Option<IssueId> {
        self.state.lock().observer.target().cloned()
    }

    /// Tear down: detach the observer and drop per-item state. A fetch still
    /// in flight completes without touching the feed.
    pub fn unmount(&self) {
        self.mount.unmount();
        let mut state = self.state.lock();
        state.observer.detach();
        self.engagement.clear();
        self.comments.clear();
    }

    /// Mount per-item state for exactly the revealed items and watch the
    /// last one while more remain.
    fn sync_revealed(&self, state: &mut FeedState) {
        let visible = state.window.slice(&state.projection);
        self.engagement.sync_mounted(visible);
        self.comments.sync_mounted(visible);

        let last = visible.last().map(|issue| issue.id.clone());
        match last {
            Some(last) if !state.window.is_exhausted(state.projection.len()) => {
                state.observer.attach(last);
            }
            _ => state.observer.detach(),
        }
    }
}
