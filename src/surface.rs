//! Plumbing shared by every top-level surface: the fetch-in-flight guard and
//! the mount lifecycle used to discard late async completions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Outcome of asking a surface to refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The fetch completed and the surface now shows its result.
    Applied,
    /// The fetch failed and the surface kept what it was already showing.
    Kept,
    /// Another fetch for this surface was already in flight; this trigger
    /// was dropped, not queued.
    Dropped,
    /// The fetch completed after the surface was unmounted or reset; its
    /// result was thrown away.
    Discarded,
    /// The surface renders nothing (no session user) and fetched nothing.
    Skipped,
}

/// At most one outstanding collection fetch per surface.
#[derive(Debug, Clone, Default)]
pub struct FetchGate {
    in_flight: Arc<AtomicBool>,
}

impl FetchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate. Returns `None` when a fetch is already outstanding.
    pub fn try_begin(&self) -> Option<FetchPermit> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FetchPermit {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Releases the gate when dropped, including when the fetching future is
/// cancelled.
#[derive(Debug)]
pub struct FetchPermit {
    in_flight: Arc<AtomicBool>,
}

impl Drop for FetchPermit {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Mount lifecycle of a surface.
///
/// An async operation takes a [`MountToken`] before it suspends and checks it
/// when it resumes; if the surface was unmounted or its state replaced in the
/// meantime, the completion must not touch surface state.
#[derive(Debug)]
pub struct MountState {
    epoch: AtomicU64,
    mounted: AtomicBool,
}

/// Proof of the epoch an async operation started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountToken(u64);

impl MountState {
    pub fn new() -> Self {
        Self {
            epoch: AtomicU64::new(0),
            mounted: AtomicBool::new(true),
        }
    }

    pub fn token(&self) -> MountToken {
        MountToken(self.epoch.load(Ordering::Acquire))
    }

    pub fn is_current(&self, token: MountToken) -> bool {
        self.is_mounted() && self.epoch.load(Ordering::Acquire) == token.0
    }

    /// Invalidate every outstanding token without unmounting.
    pub fn bump(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Mount again after [`MountState::unmount`], invalidating old tokens.
    pub fn remount(&self) {
        self.bump();
        self.mounted.store(true, Ordering::Release);
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
        self.bump();
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }
}

impl Default for MountState {
    fn default() -> Self {
        Self::new()
    }
}
