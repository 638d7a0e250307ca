//! Projection engine: filtered, sorted, limited views over a snapshot.
//!
//! Projections are pure and always recomputed from the whole collection;
//! nothing here patches a previous result.

use crate::types::{Issue, IssueStatus, UserId};

pub mod sort;

pub use sort::{SortKey, sort_issues};

/// Trait for issue predicates
pub trait IssueFilter: Send + Sync {
    fn matches(&self, issue: &Issue) -> bool;
}

/// Matches every issue
pub struct AllFilter;

impl IssueFilter for AllFilter {
    fn matches(&self, _issue: &Issue) -> bool {
        true
    }
}

/// Filter issues by a single status
pub struct StatusFilter {
    target_status: IssueStatus,
}

impl StatusFilter {
    pub fn new(status: IssueStatus) -> Self {
        Self {
            target_status: status,
        }
    }
}

impl IssueFilter for StatusFilter {
    fn matches(&self, issue: &Issue) -> bool {
        issue.status == self.target_status
    }
}

/// Filter issues whose status is any of a set
pub struct StatusSetFilter {
    statuses: Vec<IssueStatus>,
}

impl StatusSetFilter {
    pub fn new(statuses: impl IntoIterator<Item = IssueStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
        }
    }

    /// OPEN and IN_PROGRESS: what the main feed shows.
    pub fn active() -> Self {
        Self::new(IssueStatus::ALL.into_iter().filter(|s| s.is_active()))
    }
}

impl IssueFilter for StatusSetFilter {
    fn matches(&self, issue: &Issue) -> bool {
        self.statuses.contains(&issue.status)
    }
}

/// Filter issues reported by one user
pub struct PostedByFilter {
    user: UserId,
}

impl PostedByFilter {
    pub fn new(user: UserId) -> Self {
        Self { user }
    }
}

impl IssueFilter for PostedByFilter {
    fn matches(&self, issue: &Issue) -> bool {
        issue.is_posted_by(&self.user)
    }
}

/// Case-insensitive substring match on title or locality.
///
/// The query is trimmed; a blank query matches everything.
pub struct SearchFilter {
    needle: String,
}

impl SearchFilter {
    pub fn new(query: &str) -> Self {
        Self {
            needle: query.trim().to_lowercase(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.needle.is_empty()
    }
}

impl IssueFilter for SearchFilter {
    fn matches(&self, issue: &Issue) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        issue.title.to_lowercase().contains(&self.needle)
            || issue.locality.to_lowercase().contains(&self.needle)
    }
}

/// Result of applying a projection to a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    /// Matching issues in projection order, at most `limit` of them
    pub items: Vec<Issue>,
    /// Number of matches before truncation
    pub total: usize,
    /// True iff more issues matched than the limit allowed
    pub has_more: bool,
}

impl Projection {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Filter, stable-sort, then truncate.
pub fn project(
    collection: &[Issue],
    filter: &dyn IssueFilter,
    sort_key: SortKey,
    limit: Option<usize>,
) -> Projection {
    let mut items: Vec<Issue> = collection
        .iter()
        .filter(|issue| filter.matches(issue))
        .cloned()
        .collect();

    sort_issues(&mut items, sort_key);

    let total = items.len();
    if let Some(limit) = limit
        && limit < items.len()
    {
        items.truncate(limit);
    }

    Projection {
        has_more: items.len() < total,
        items,
        total,
    }
}

/// Reusable projection: AND-composed filters, a sort key and a limit.
pub struct ProjectionSpec {
    filters: Vec<Box<dyn IssueFilter>>,
    sort_key: SortKey,
    limit: Option<usize>,
}

impl ProjectionSpec {
    /// Active issues in collection order; the explore feed.
    pub fn feed() -> Self {
        ProjectionBuilder::new()
            .with_filter(Box::new(StatusSetFilter::active()))
            .build()
    }

    /// In-progress issues, most upvoted first.
    pub fn ongoing_board(limit: usize) -> Self {
        ProjectionBuilder::new()
            .with_filter(Box::new(StatusFilter::new(IssueStatus::InProgress)))
            .with_sort(SortKey::Upvotes)
            .with_limit(limit)
            .build()
    }

    /// Closed issues, newest first.
    pub fn closed_board(limit: usize) -> Self {
        ProjectionBuilder::new()
            .with_filter(Box::new(StatusFilter::new(IssueStatus::Closed)))
            .with_sort(SortKey::Recency)
            .with_limit(limit)
            .build()
    }

    /// Every issue regardless of status, most upvoted first.
    pub fn trending(limit: usize) -> Self {
        ProjectionBuilder::new()
            .with_sort(SortKey::Upvotes)
            .with_limit(limit)
            .build()
    }

    /// Narrow this projection with one more filter.
    pub fn and(mut self, filter: Box<dyn IssueFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Apply to a collection.
    pub fn apply(&self, collection: &[Issue]) -> Projection {
        project(collection, self, self.sort_key, self.limit)
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

impl IssueFilter for ProjectionSpec {
    fn matches(&self, issue: &Issue) -> bool {
        self.filters.iter().all(|f| f.matches(issue))
    }
}

/// Builder for [`ProjectionSpec`]
pub struct ProjectionBuilder {
    filters: Vec<Box<dyn IssueFilter>>,
    sort_key: SortKey,
    limit: Option<usize>,
}

impl ProjectionBuilder {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            sort_key: SortKey::default(),
            limit: None,
        }
    }

    /// Add a filter (AND composition)
    pub fn with_filter(mut self, filter: Box<dyn IssueFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_sort(mut self, sort_key: SortKey) -> Self {
        self.sort_key = sort_key;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn build(self) -> ProjectionSpec {
        ProjectionSpec {
            filters: self.filters,
            sort_key: self.sort_key,
            limit: self.limit,
        }
    }
}

impl Default for ProjectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
