//! "My issues" sidebar: the signed-in user's issues grouped by status.
//!
//! This is the only surface that paints data from a previous session. On
//! mount it reads the persisted entry synchronously and shows it, then
//! replaces it once its own fetch succeeds. A failed fetch keeps whatever is
//! on screen and leaves the persisted entry alone.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheService, Cacheable};
use crate::fetcher::CollectionFetcher;
use crate::projection::{PostedByFilter, SortKey, StatusFilter, project};
use crate::surface::{FetchGate, MountState, RefreshOutcome};
use crate::types::{Issue, IssueId, IssueStatus, User, UserId};

pub const SIDEBAR_CACHE_KEY: &str = "my_issues_sidebar";

/// One value per status bucket, serialized under the wire status names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBuckets<T> {
    #[serde(rename = "OPEN")]
    pub open: T,
    #[serde(rename = "IN_PROGRESS")]
    pub in_progress: T,
    #[serde(rename = "CLOSED")]
    pub closed: T,
}

impl<T> StatusBuckets<T> {
    pub fn from_fn(mut f: impl FnMut(IssueStatus) -> T) -> Self {
        Self {
            open: f(IssueStatus::Open),
            in_progress: f(IssueStatus::InProgress),
            closed: f(IssueStatus::Closed),
        }
    }

    pub fn get(&self, status: IssueStatus) -> &T {
        match status {
            IssueStatus::Open => &self.open,
            IssueStatus::InProgress => &self.in_progress,
            IssueStatus::Closed => &self.closed,
        }
    }
}

/// Persisted sidebar state. Always written whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarEntry {
    /// User the entry was computed for; another user's entry is never
    /// painted.
    pub owner: UserId,
    pub grouped_issues: StatusBuckets<Vec<Issue>>,
    pub has_more: StatusBuckets<bool>,
}

impl Cacheable for SidebarEntry {
    const SCHEMA_VERSION: u32 = 1;
}

/// Partition `issues` by status, keeping the `limit` most upvoted of each.
pub fn group_by_status(
    issues: &[Issue],
    limit: usize,
) -> (StatusBuckets<Vec<Issue>>, StatusBuckets<bool>) {
    let projections = StatusBuckets::from_fn(|status| {
        project(issues, &StatusFilter::new(status), SortKey::Upvotes, Some(limit))
    });
    let has_more = StatusBuckets::from_fn(|status| projections.get(status).has_more);
    let grouped = StatusBuckets {
        open: projections.open.items,
        in_progress: projections.in_progress.items,
        closed: projections.closed.items,
    };
    (grouped, has_more)
}

/// Where the painted buckets came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewSource {
    /// Nothing cached and no fetch has succeeded yet.
    Empty,
    /// Persisted by an earlier session.
    Cache,
    /// Computed from this session's fetch.
    Network,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SidebarPanel {
    pub user: User,
    pub grouped_issues: StatusBuckets<Vec<Issue>>,
    pub has_more: StatusBuckets<bool>,
    pub source: ViewSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SidebarView {
    /// No session user: the sidebar renders nothing.
    Hidden,
    Shown(SidebarPanel),
}

#[derive(Default)]
struct SidebarState {
    user: Option<User>,
    entry: Option<SidebarEntry>,
    source: Option<ViewSource>,
}

pub struct MyIssuesSidebar {
    fetcher: CollectionFetcher,
    cache: CacheService,
    bucket_limit: usize,
    gate: FetchGate,
    mount: MountState,
    state: Mutex<SidebarState>,
}

impl MyIssuesSidebar {
    pub fn new(fetcher: CollectionFetcher, cache: CacheService, bucket_limit: usize) -> Self {
        Self {
            fetcher,
            cache,
            bucket_limit,
            gate: FetchGate::new(),
            mount: MountState::new(),
            state: Mutex::new(SidebarState::default()),
        }
    }

    /// Paint from the persisted entry. Without a user nothing is read.
    pub fn mount(&self, user: Option<User>) -> SidebarView {
        self.mount.remount();
        let mut state = self.state.lock();
        *state = SidebarState::default();

        if let Some(user) = user {
            let cached = self
                .cache
                .get::<SidebarEntry>(SIDEBAR_CACHE_KEY)
                .filter(|entry| entry.owner == user.id);
            state.source = Some(if cached.is_some() {
                ViewSource::Cache
            } else {
                ViewSource::Empty
            });
            state.entry = cached;
            state.user = Some(user);
        }

        Self::render(&state)
    }

    /// Fetch, regroup and persist. A failed fetch keeps the painted state.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(user_id) = self.state.lock().user.as_ref().map(|u| u.id.clone()) else {
            return RefreshOutcome::Skipped;
        };
        let Some(_permit) = self.gate.try_begin() else {
            return RefreshOutcome::Dropped;
        };
        let token = self.mount.token();

        let snapshot = self.fetcher.fetch().await;

        if !self.mount.is_current(token) {
            return RefreshOutcome::Discarded;
        }
        if snapshot.is_degraded() {
            return RefreshOutcome::Kept;
        }

        let mine = project(
            snapshot.issues(),
            &PostedByFilter::new(user_id.clone()),
            SortKey::Original,
            None,
        );
        let (grouped_issues, has_more) = group_by_status(&mine.items, self.bucket_limit);
        let entry = SidebarEntry {
            owner: user_id,
            grouped_issues,
            has_more,
        };

        if let Err(e) = self.cache.put(SIDEBAR_CACHE_KEY, &entry, None) {
            tracing::warn!("Failed to persist sidebar entry: {e}");
        }

        let mut state = self.state.lock();
        state.entry = Some(entry);
        state.source = Some(ViewSource::Network);
        RefreshOutcome::Applied
    }

    pub fn view(&self) -> SidebarView {
        Self::render(&self.state.lock())
    }

    /// Profile route listing every issue in `status`, offered only when the
    /// bucket was truncated.
    pub fn view_more(&self, status: IssueStatus) -> Option<String> {
        let state = self.state.lock();
        let entry = state.entry.as_ref()?;
        state.user.as_ref()?;
        entry
            .has_more
            .get(status)
            .then(|| format!("/profile?status={status}"))
    }

    /// Profile route focused on one issue.
    pub fn issue_link(&self, id: &IssueId) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(id.as_str().as_bytes()).collect();
        format!("/profile?issue={encoded}")
    }

    pub fn unmount(&self) {
        self.mount.unmount();
        *self.state.lock() = SidebarState::default();
    }

    fn render(state: &SidebarState) -> SidebarView {
        let Some(user) = &state.user else {
            return SidebarView::Hidden;
        };
        let (grouped_issues, has_more) = match &state.entry {
            Some(entry) => (entry.grouped_issues.clone(), entry.has_more.clone()),
            None => Default::default(),
        };
        SidebarView::Shown(SidebarPanel {
            user: user.clone(),
            grouped_issues,
            has_more,
            source: state.source.unwrap_or(ViewSource::Empty),
        })
    }
}
