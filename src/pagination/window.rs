//! Incremental reveal of a projection in fixed-size batches.

/// Reveals `page * batch_size` items of whatever projection it is applied to.
///
/// The window never stores the projection itself: callers pass the current
/// length (or slice) so a recomputed projection is always sliced against
/// fresh data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationWindow {
    batch_size: usize,
    page: usize,
}

impl PaginationWindow {
    /// A zero batch size is clamped to 1.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            page: 1,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Back to the first page. Called when the filter changes or the
    /// snapshot is replaced.
    pub fn reset(&mut self) {
        self.page = 1;
    }

    /// Reveal one more batch of a projection of length `len`.
    ///
    /// Returns false, leaving the window unchanged, once everything is
    /// already revealed.
    pub fn advance(&mut self, len: usize) -> bool {
        if self.is_exhausted(len) {
            return false;
        }
        self.page += 1;
        true
    }

    /// Number of items currently revealed out of `len`.
    pub fn revealed(&self, len: usize) -> usize {
        self.page.saturating_mul(self.batch_size).min(len)
    }

    pub fn is_exhausted(&self, len: usize) -> bool {
        self.page.saturating_mul(self.batch_size) >= len
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..self.revealed(items.len())]
    }
}
