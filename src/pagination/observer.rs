//! "Nearing end of list" signal with at most one live subscription.

use crate::types::IssueId;

/// Watches a single target item and fires once when it becomes visible.
#[derive(Debug, Default)]
pub struct ProximityObserver {
    target: Option<IssueId>,
    fired: bool,
}

impl ProximityObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch `target`, tearing down any previous subscription first.
    ///
    /// Re-attaching to the target already watched is a no-op and does not
    /// re-arm a subscription that has fired.
    pub fn attach(&mut self, target: IssueId) {
        if self.target.as_ref() == Some(&target) {
            return;
        }
        self.detach();
        self.target = Some(target);
    }

    pub fn detach(&mut self) {
        self.target = None;
        self.fired = false;
    }

    pub fn is_attached(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<&IssueId> {
        self.target.as_ref()
    }

    /// Report that `visible` scrolled into view. Returns true exactly once
    /// per attachment, when `visible` is the watched target.
    pub fn signal(&mut self, visible: &IssueId) -> bool {
        if self.fired || self.target.as_ref() != Some(visible) {
            return false;
        }
        self.fired = true;
        true
    }
}
