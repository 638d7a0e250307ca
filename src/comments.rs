//! Comment lazy loader.
//!
//! Comments for an item are fetched at most once per mount, on hover or on
//! click, whichever comes first. A failed fetch is terminal for that mount:
//! the item shows an empty list and is not retried until it is remounted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::api::IssueApi;
use crate::engagement::EngagementReconciler;
use crate::types::{Comment, Issue, IssueId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotLoaded,
    Loading,
    Loaded,
}

/// Result of a prefetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchOutcome {
    /// This call fetched the list; carries the number of comments.
    Fetched(usize),
    /// The fetch failed; the item is marked loaded with no comments.
    Failed,
    /// Already loaded for this mount; no request was made.
    AlreadyLoaded,
    /// Another caller's request is in flight; no request was made.
    InFlight,
    /// The item was unmounted before the response arrived.
    Discarded,
    NotMounted,
}

#[derive(Debug)]
struct CommentSlot {
    state: LoadState,
    comments: Vec<Comment>,
    visible: bool,
    mount_id: u64,
}

/// Per-item comment state for every mounted item.
pub struct CommentLoader {
    api: Arc<dyn IssueApi>,
    engagement: Arc<EngagementReconciler>,
    slots: DashMap<IssueId, CommentSlot>,
    next_mount: AtomicU64,
}

impl CommentLoader {
    pub fn new(api: Arc<dyn IssueApi>, engagement: Arc<EngagementReconciler>) -> Self {
        Self {
            api,
            engagement,
            slots: DashMap::new(),
            next_mount: AtomicU64::new(1),
        }
    }

    pub fn mount(&self, id: &IssueId) {
        self.slots.entry(id.clone()).or_insert_with(|| CommentSlot {
            state: LoadState::NotLoaded,
            comments: Vec::new(),
            visible: false,
            mount_id: self.next_mount.fetch_add(1, Ordering::Relaxed),
        });
    }

    pub fn unmount(&self, id: &IssueId) {
        self.slots.remove(id);
    }

    /// Keep slots only for `issues`, mounting any that are new.
    pub fn sync_mounted(&self, issues: &[Issue]) {
        self.slots
            .retain(|id, _| issues.iter().any(|issue| &issue.id == id));
        for issue in issues {
            self.mount(&issue.id);
        }
    }

    pub fn clear(&self) {
        self.slots.clear();
    }

    pub fn state(&self, id: &IssueId) -> Option<LoadState> {
        self.slots.get(id).map(|slot| slot.state)
    }

    pub fn is_visible(&self, id: &IssueId) -> bool {
        self.slots.get(id).is_some_and(|slot| slot.visible)
    }

    pub fn comments(&self, id: &IssueId) -> Vec<Comment> {
        self.slots
            .get(id)
            .map(|slot| slot.comments.clone())
            .unwrap_or_default()
    }

    /// Fetch the comment list unless this mount already has (or is getting)
    /// it. On success the item's displayed comment count becomes the list
    /// length.
    pub async fn prefetch(&self, id: &IssueId) -> PrefetchOutcome {
        let mount_id = {
            let Some(mut slot) = self.slots.get_mut(id) else {
                return PrefetchOutcome::NotMounted;
            };
            match slot.state {
                LoadState::Loaded => return PrefetchOutcome::AlreadyLoaded,
                LoadState::Loading => return PrefetchOutcome::InFlight,
                LoadState::NotLoaded => {}
            }
            slot.state = LoadState::Loading;
            slot.mount_id
        };

        let result = self.api.comments(id).await;

        let Some(mut slot) = self.slots.get_mut(id).filter(|slot| slot.mount_id == mount_id)
        else {
            tracing::debug!("Discarding comments for unmounted issue {id}");
            return PrefetchOutcome::Discarded;
        };
        slot.state = LoadState::Loaded;

        match result {
            Ok(comments) => {
                let count = comments.len();
                slot.comments = comments;
                drop(slot);
                self.engagement.set_comment_count(id, count as u64);
                PrefetchOutcome::Fetched(count)
            }
            Err(e) => {
                tracing::warn!("Loading comments for issue {id} failed: {e}");
                slot.comments.clear();
                PrefetchOutcome::Failed
            }
        }
    }

    /// Flip comment visibility and make sure the list is loading.
    ///
    /// Visibility does not wait for the fetch, and hiding then showing again
    /// never refetches. Returns the new visibility, or `None` when the item
    /// is not mounted.
    pub async fn toggle_visibility(&self, id: &IssueId) -> Option<bool> {
        let visible = {
            let mut slot = self.slots.get_mut(id)?;
            slot.visible = !slot.visible;
            slot.visible
        };
        self.prefetch(id).await;
        Some(visible)
    }

    /// Replace the list after the user posted a comment. The displayed
    /// comment count follows the new list.
    pub fn replace_comments(&self, id: &IssueId, comments: Vec<Comment>) -> bool {
        let count = comments.len();
        match self.slots.get_mut(id) {
            Some(mut slot) => {
                slot.comments = comments;
                slot.state = LoadState::Loaded;
            }
            None => return false,
        }
        self.engagement.set_comment_count(id, count as u64);
        true
    }
}
