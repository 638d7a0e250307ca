//! Sort orders for projections.
//!
//! Every order is a stable sort: issues with equal keys keep their order
//! from the collection, so re-projecting an unchanged snapshot can never
//! reshuffle a surface.

use std::cmp::Ordering;

use crate::types::Issue;

/// Sort key for projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Collection order as delivered by the backend
    #[default]
    Original,
    /// Most upvoted first
    Upvotes,
    /// Newest first; issues without a timestamp go last
    Recency,
}

impl SortKey {
    fn compare(self, a: &Issue, b: &Issue) -> Ordering {
        match self {
            SortKey::Original => Ordering::Equal,
            SortKey::Upvotes => b.upvote_count.cmp(&a.upvote_count),
            SortKey::Recency => match (&a.created_at, &b.created_at) {
                (Some(ta), Some(tb)) => tb.cmp(ta),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }
}

/// Sort issues in place by `key`.
pub fn sort_issues(issues: &mut [Issue], key: SortKey) {
    if key == SortKey::Original {
        return;
    }
    issues.sort_by(|a, b| key.compare(a, b));
}
