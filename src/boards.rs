//! Global status boards: ongoing issues by upvotes and recently closed
//! issues by recency. Loaded once per mount, never polled or cached.

use jiff::Timestamp;
use serde::Serialize;

use crate::fetcher::{CollectionFetcher, Snapshot};
use crate::projection::ProjectionSpec;
use crate::types::{Issue, IssueId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardEntry {
    pub id: IssueId,
    pub title: String,
    pub locality: String,
    pub upvotes: u64,
    pub created_at: Option<Timestamp>,
    /// Explore page anchor for the issue
    pub link: String,
}

impl From<Issue> for BoardEntry {
    fn from(issue: Issue) -> Self {
        Self {
            link: issue.explore_link(),
            id: issue.id,
            title: issue.title,
            locality: issue.locality,
            upvotes: issue.upvote_count,
            created_at: issue.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GlobalBoards {
    /// In-progress issues, most upvoted first
    pub ongoing: Vec<BoardEntry>,
    /// Closed issues, newest first
    pub recently_closed: Vec<BoardEntry>,
}

impl GlobalBoards {
    /// Fetch once and build both boards. A failed fetch yields two empty
    /// boards.
    pub async fn load(fetcher: &CollectionFetcher, limit: usize) -> Self {
        Self::from_snapshot(&fetcher.fetch().await, limit)
    }

    pub fn from_snapshot(snapshot: &Snapshot, limit: usize) -> Self {
        let board = |spec: ProjectionSpec| -> Vec<BoardEntry> {
            spec.apply(snapshot.issues())
                .items
                .into_iter()
                .map(BoardEntry::from)
                .collect()
        };

        Self {
            ongoing: board(ProjectionSpec::ongoing_board(limit)),
            recently_closed: board(ProjectionSpec::closed_board(limit)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ongoing.is_empty() && self.recently_closed.is_empty()
    }
}
