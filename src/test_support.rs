//! Shared helpers for unit tests: a scripted [`IssueApi`] and RAII guards
//! for process-global state.

use std::env;
use std::ffi::OsString;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use jiff::Timestamp;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::api::IssueApi;
use crate::error::{FeedError, Result};
use crate::types::{Comment, CommentId, Issue, IssueId, IssueStatus, User, UserId, UserSummary};

/// RAII guard that restores an environment variable on drop.
///
/// Tests using it must be `#[serial]`: the environment is process-global.
pub struct EnvGuard {
    key: String,
    original: Option<OsString>,
}

impl EnvGuard {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            original: env::var_os(key),
        }
    }

    /// # Safety
    /// Calls `std::env::set_var`; only use from `#[serial]` tests.
    pub unsafe fn set(key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        let guard = Self::new(key);
        unsafe { env::set_var(key, value) };
        guard
    }

    /// # Safety
    /// Calls `std::env::remove_var`; only use from `#[serial]` tests.
    pub unsafe fn remove(key: &str) -> Self {
        let guard = Self::new(key);
        unsafe { env::remove_var(key) };
        guard
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: tests using EnvGuard are #[serial].
        match &self.original {
            Some(val) => unsafe { env::set_var(&self.key, val) },
            None => unsafe { env::remove_var(&self.key) },
        }
    }
}

/// Build an issue with the fields projections care about.
pub fn issue(id: &str, status: IssueStatus, upvotes: u64) -> Issue {
    Issue {
        id: IssueId::new_unchecked(id),
        title: format!("Issue {id}"),
        description: None,
        status,
        category: "Roads".to_string(),
        department: "Public Works".to_string(),
        locality: "Ward 1".to_string(),
        created_at: None,
        upvote_count: upvotes,
        comment_count: 0,
        posted_by: None,
        media: Vec::new(),
    }
}

/// Like [`issue`], created `secs` seconds after the epoch.
pub fn issue_at(id: &str, status: IssueStatus, upvotes: u64, secs: i64) -> Issue {
    Issue {
        created_at: Some(Timestamp::from_second(secs).unwrap()),
        ..issue(id, status, upvotes)
    }
}

/// Like [`issue`], reported by `user`.
pub fn issue_by(id: &str, status: IssueStatus, upvotes: u64, user: &str) -> Issue {
    Issue {
        posted_by: Some(UserSummary {
            id: Some(UserId::new_unchecked(user)),
            name: format!("User {user}"),
            ..Default::default()
        }),
        ..issue(id, status, upvotes)
    }
}

pub fn user(id: &str) -> User {
    User {
        id: UserId::new_unchecked(id),
        full_name: format!("User {id}"),
        email: format!("{id}@example.org"),
        profile_photo_url: None,
        locality: None,
        zone: None,
        city: None,
    }
}

pub fn comment(id: &str, body: &str) -> Comment {
    Comment {
        id: CommentId::new_unchecked(id),
        issue_id: None,
        author: None,
        body: body.to_string(),
        created_at: None,
    }
}

pub fn ids(issues: &[Issue]) -> Vec<&str> {
    issues.iter().map(|i| i.id.as_str()).collect()
}

fn scripted_failure(endpoint: &str) -> FeedError {
    FeedError::Status {
        endpoint: endpoint.to_string(),
        status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Scripted backend with call counters, programmable failures and an
/// optional gate that holds requests open until released.
pub struct FakeApi {
    issues: Mutex<Vec<Issue>>,
    comments: DashMap<IssueId, Vec<Comment>>,
    user: Mutex<Option<User>>,

    fail_explore: AtomicBool,
    fail_comments: AtomicBool,
    fail_upvote: AtomicBool,
    fail_user: AtomicBool,

    explore_calls: AtomicUsize,
    comment_calls: AtomicUsize,
    upvote_calls: AtomicUsize,

    gated: AtomicBool,
    gate: Semaphore,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            issues: Mutex::new(Vec::new()),
            comments: DashMap::new(),
            user: Mutex::new(None),
            fail_explore: AtomicBool::new(false),
            fail_comments: AtomicBool::new(false),
            fail_upvote: AtomicBool::new(false),
            fail_user: AtomicBool::new(false),
            explore_calls: AtomicUsize::new(0),
            comment_calls: AtomicUsize::new(0),
            upvote_calls: AtomicUsize::new(0),
            gated: AtomicBool::new(false),
            gate: Semaphore::new(0),
        })
    }

    pub fn with_issues(issues: Vec<Issue>) -> Arc<Self> {
        let api = Self::new();
        api.set_issues(issues);
        api
    }

    pub fn set_issues(&self, issues: Vec<Issue>) {
        *self.issues.lock() = issues;
    }

    pub fn set_comments(&self, issue: &str, comments: Vec<Comment>) {
        self.comments.insert(IssueId::new_unchecked(issue), comments);
    }

    pub fn set_user(&self, user: Option<User>) {
        *self.user.lock() = user;
    }

    pub fn fail_explore(&self, fail: bool) {
        self.fail_explore.store(fail, Ordering::SeqCst);
    }

    pub fn fail_comments(&self, fail: bool) {
        self.fail_comments.store(fail, Ordering::SeqCst);
    }

    pub fn fail_upvote(&self, fail: bool) {
        self.fail_upvote.store(fail, Ordering::SeqCst);
    }

    pub fn fail_user(&self, fail: bool) {
        self.fail_user.store(fail, Ordering::SeqCst);
    }

    /// Hold every subsequent request until [`FakeApi::release`] is called.
    pub fn hold(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    /// Let `n` held requests proceed.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn explore_calls(&self) -> usize {
        self.explore_calls.load(Ordering::SeqCst)
    }

    pub fn comment_calls(&self) -> usize {
        self.comment_calls.load(Ordering::SeqCst)
    }

    pub fn upvote_calls(&self) -> usize {
        self.upvote_calls.load(Ordering::SeqCst)
    }

    async fn wait_for_gate(&self) {
        if self.gated.load(Ordering::SeqCst)
            && let Ok(permit) = self.gate.acquire().await
        {
            permit.forget();
        }
    }
}

#[async_trait]
impl IssueApi for FakeApi {
    async fn explore(&self) -> Result<Vec<Issue>> {
        self.explore_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        if self.fail_explore.load(Ordering::SeqCst) {
            return Err(scripted_failure("/issues/explore"));
        }
        Ok(self.issues.lock().clone())
    }

    async fn comments(&self, issue: &IssueId) -> Result<Vec<Comment>> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        if self.fail_comments.load(Ordering::SeqCst) {
            return Err(scripted_failure("/issues/comments"));
        }
        Ok(self
            .comments
            .get(issue)
            .map(|c| c.value().clone())
            .unwrap_or_default())
    }

    async fn toggle_upvote(&self, _issue: &IssueId) -> Result<()> {
        self.upvote_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        if self.fail_upvote.load(Ordering::SeqCst) {
            return Err(scripted_failure("/issues/upvote"));
        }
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>> {
        if self.fail_user.load(Ordering::SeqCst) {
            return Err(scripted_failure("/users/me"));
        }
        Ok(self.user.lock().clone())
    }
}
