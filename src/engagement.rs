//! Engagement reconciler: per-item upvote and comment counters layered over
//! the last fetched snapshot.
//!
//! Upvotes are a strict two-state toggle applied locally when the request is
//! dispatched. The backend call only flips the server-side boolean; its
//! outcome never adjusts the displayed count, and a failed call is logged
//! but not rolled back. The count converges on the next snapshot, which
//! discards every overlay.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::api::IssueApi;
use crate::fetcher::Snapshot;
use crate::types::{Issue, IssueId};

/// Local display state for one mounted issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementOverlay {
    pub has_upvoted_locally: bool,
    pub displayed_upvote_count: u64,
    pub displayed_comment_count: u64,
}

impl EngagementOverlay {
    pub fn from_issue(issue: &Issue) -> Self {
        Self {
            has_upvoted_locally: false,
            displayed_upvote_count: issue.upvote_count,
            displayed_comment_count: issue.comment_count,
        }
    }

    /// Flip the upvote state, moving the count by one (floored at 0).
    pub fn toggle(&mut self) {
        if self.has_upvoted_locally {
            self.displayed_upvote_count = self.displayed_upvote_count.saturating_sub(1);
        } else {
            self.displayed_upvote_count += 1;
        }
        self.has_upvoted_locally = !self.has_upvoted_locally;
    }
}

/// Result of an upvote toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Toggled locally and the backend accepted the request.
    Applied,
    /// Another toggle for this item is still in flight; nothing changed.
    Busy,
    /// Toggled locally; the backend call failed and was logged.
    Failed,
    /// The item was unmounted or the snapshot replaced before the call
    /// settled.
    Discarded,
    /// The item is not mounted.
    NotMounted,
}

#[derive(Debug)]
struct Slot {
    overlay: EngagementOverlay,
    in_flight: bool,
    mount_id: u64,
}

/// Owns the overlays of every mounted item for the current snapshot.
pub struct EngagementReconciler {
    api: Arc<dyn IssueApi>,
    slots: DashMap<IssueId, Slot>,
    next_mount: AtomicU64,
}

impl EngagementReconciler {
    pub fn new(api: Arc<dyn IssueApi>) -> Self {
        Self {
            api,
            slots: DashMap::new(),
            next_mount: AtomicU64::new(1),
        }
    }

    fn slot_for(&self, issue: &Issue) -> Slot {
        Slot {
            overlay: EngagementOverlay::from_issue(issue),
            in_flight: false,
            mount_id: self.next_mount.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Create the overlay for `issue`. A mounted item keeps its overlay.
    pub fn mount(&self, issue: &Issue) -> EngagementOverlay {
        self.slots
            .entry(issue.id.clone())
            .or_insert_with(|| self.slot_for(issue))
            .overlay
    }

    pub fn unmount(&self, id: &IssueId) {
        self.slots.remove(id);
    }

    pub fn is_mounted(&self, id: &IssueId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn mounted_count(&self) -> usize {
        self.slots.len()
    }

    pub fn overlay(&self, id: &IssueId) -> Option<EngagementOverlay> {
        self.slots.get(id).map(|slot| slot.overlay)
    }

    /// Mount exactly `issues`: new items get fresh overlays, items no
    /// longer present are unmounted, the rest are left alone.
    pub fn sync_mounted(&self, issues: &[Issue]) {
        self.slots
            .retain(|id, _| issues.iter().any(|issue| &issue.id == id));
        for issue in issues {
            self.mount(issue);
        }
    }

    /// Discard every overlay and rebuild those still present in `snapshot`
    /// from its values. In-flight toggles for the old overlays are
    /// discarded when they settle.
    pub fn reset(&self, snapshot: &Snapshot) {
        let mounted: Vec<IssueId> = self.slots.iter().map(|e| e.key().clone()).collect();
        self.slots.clear();
        for id in mounted {
            if let Some(issue) = snapshot.get(&id) {
                self.slots.insert(id, self.slot_for(issue));
            }
        }
        tracing::debug!(
            "Engagement overlays reset for generation {} ({} remounted)",
            snapshot.generation(),
            self.slots.len()
        );
    }

    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Set the displayed comment count, superseding the snapshot value.
    pub fn set_comment_count(&self, id: &IssueId, count: u64) -> bool {
        match self.slots.get_mut(id) {
            Some(mut slot) => {
                slot.overlay.displayed_comment_count = count;
                true
            }
            None => false,
        }
    }

    /// Toggle the upvote on a mounted item and send the request.
    pub async fn toggle_upvote(&self, id: &IssueId) -> ToggleOutcome {
        let mount_id = {
            let Some(mut slot) = self.slots.get_mut(id) else {
                return ToggleOutcome::NotMounted;
            };
            if slot.in_flight {
                return ToggleOutcome::Busy;
            }
            slot.in_flight = true;
            slot.overlay.toggle();
            slot.mount_id
        };

        let result = self.api.toggle_upvote(id).await;

        let still_mounted = match self.slots.get_mut(id) {
            Some(mut slot) if slot.mount_id == mount_id => {
                slot.in_flight = false;
                true
            }
            _ => false,
        };

        match result {
            Err(e) => {
                tracing::warn!("Upvote for issue {id} failed: {e}");
                if still_mounted {
                    ToggleOutcome::Failed
                } else {
                    ToggleOutcome::Discarded
                }
            }
            Ok(()) if still_mounted => ToggleOutcome::Applied,
            Ok(()) => {
                tracing::debug!("Discarding upvote completion for unmounted issue {id}");
                ToggleOutcome::Discarded
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeApi, issue};
    use crate::types::IssueStatus;

    fn id(s: &str) -> IssueId {
        IssueId::new_unchecked(s)
    }

    #[test]
    fn test_toggle_is_its_own_inverse() {
        for upvotes in [0, 1, 41] {
            let original = EngagementOverlay::from_issue(&issue("1", IssueStatus::Open, upvotes));
            let mut overlay = original;

            overlay.toggle();
            assert!(overlay.has_upvoted_locally);
            assert_eq!(overlay.displayed_upvote_count, upvotes + 1);

            overlay.toggle();
            assert_eq!(overlay, original);
        }
    }

    #[test]
    fn test_decrement_is_floored() {
        let mut overlay = EngagementOverlay {
            has_upvoted_locally: true,
            displayed_upvote_count: 0,
            displayed_comment_count: 0,
        };
        overlay.toggle();
        assert_eq!(overlay.displayed_upvote_count, 0);
        assert!(!overlay.has_upvoted_locally);
    }

    #[tokio::test]
    async fn test_toggle_round_trip_through_backend() {
        let api = FakeApi::new();
        let reconciler = EngagementReconciler::new(api.clone());
        reconciler.mount(&issue("1", IssueStatus::Open, 4));

        assert_eq!(reconciler.toggle_upvote(&id("1")).await, ToggleOutcome::Applied);
        assert_eq!(reconciler.overlay(&id("1")).unwrap().displayed_upvote_count, 5);

        assert_eq!(reconciler.toggle_upvote(&id("1")).await, ToggleOutcome::Applied);
        let overlay = reconciler.overlay(&id("1")).unwrap();
        assert_eq!(overlay.displayed_upvote_count, 4);
        assert!(!overlay.has_upvoted_locally);
        assert_eq!(api.upvote_calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_toggle_is_rejected() {
        let api = FakeApi::new();
        api.hold();
        let reconciler = EngagementReconciler::new(api.clone());
        reconciler.mount(&issue("1", IssueStatus::Open, 4));
        let one = id("1");

        let first = reconciler.toggle_upvote(&one);
        let second = async {
            tokio::task::yield_now().await;
            let outcome = reconciler.toggle_upvote(&one).await;
            api.release(1);
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first, ToggleOutcome::Applied);
        assert_eq!(second, ToggleOutcome::Busy);
        assert_eq!(api.upvote_calls(), 1);
        assert_eq!(reconciler.overlay(&id("1")).unwrap().displayed_upvote_count, 5);
    }

    #[tokio::test]
    async fn test_failure_keeps_optimistic_state() {
        let api = FakeApi::new();
        api.fail_upvote(true);
        let reconciler = EngagementReconciler::new(api.clone());
        reconciler.mount(&issue("1", IssueStatus::Open, 2));

        assert_eq!(reconciler.toggle_upvote(&id("1")).await, ToggleOutcome::Failed);
        let overlay = reconciler.overlay(&id("1")).unwrap();
        assert!(overlay.has_upvoted_locally);
        assert_eq!(overlay.displayed_upvote_count, 3);
        assert_eq!(overlay.displayed_comment_count, 0);

        api.fail_upvote(false);
        assert_eq!(reconciler.toggle_upvote(&id("1")).await, ToggleOutcome::Applied);
    }

    #[tokio::test]
    async fn test_unmounted_item() {
        let reconciler = EngagementReconciler::new(FakeApi::new());
        assert_eq!(reconciler.toggle_upvote(&id("9")).await, ToggleOutcome::NotMounted);
    }

    #[tokio::test]
    async fn test_reset_discards_late_completion() {
        let api = FakeApi::new();
        api.hold();
        let reconciler = EngagementReconciler::new(api.clone());
        reconciler.mount(&issue("1", IssueStatus::Open, 4));
        let one = id("1");

        let toggle = reconciler.toggle_upvote(&one);
        let refetch = async {
            tokio::task::yield_now().await;
            reconciler.reset(&Snapshot::from_issues(vec![issue("1", IssueStatus::Open, 10)]));
            api.release(1);
        };
        let (outcome, ()) = tokio::join!(toggle, refetch);

        assert_eq!(outcome, ToggleOutcome::Discarded);
        let overlay = reconciler.overlay(&id("1")).unwrap();
        assert_eq!(overlay.displayed_upvote_count, 10);
        assert!(!overlay.has_upvoted_locally);

        // The fresh overlay is not stuck behind the discarded request.
        api.release(1);
        assert_eq!(reconciler.toggle_upvote(&id("1")).await, ToggleOutcome::Applied);
    }

    #[test]
    fn test_mount_keeps_existing_overlay() {
        let reconciler = EngagementReconciler::new(FakeApi::new());
        reconciler.mount(&issue("1", IssueStatus::Open, 4));
        reconciler.set_comment_count(&id("1"), 7);

        let overlay = reconciler.mount(&issue("1", IssueStatus::Open, 99));
        assert_eq!(overlay.displayed_upvote_count, 4);
        assert_eq!(overlay.displayed_comment_count, 7);
    }

    #[test]
    fn test_reset_and_sync() {
        let reconciler = EngagementReconciler::new(FakeApi::new());
        reconciler.sync_mounted(&[
            issue("1", IssueStatus::Open, 1),
            issue("2", IssueStatus::Open, 2),
        ]);
        assert_eq!(reconciler.mounted_count(), 2);

        reconciler.reset(&Snapshot::from_issues(vec![issue("2", IssueStatus::Open, 20)]));
        assert!(!reconciler.is_mounted(&id("1")));
        assert_eq!(reconciler.overlay(&id("2")).unwrap().displayed_upvote_count, 20);

        reconciler.sync_mounted(&[issue("3", IssueStatus::Open, 3)]);
        assert!(!reconciler.is_mounted(&id("2")));
        assert!(reconciler.is_mounted(&id("3")));

        assert!(!reconciler.set_comment_count(&id("2"), 1));
        reconciler.clear();
        assert_eq!(reconciler.mounted_count(), 0);
    }
}
