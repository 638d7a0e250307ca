#[macro_use]
mod macros;

pub mod api;
pub mod boards;
pub mod cache;
pub mod cache_error;
pub mod client;
pub mod comments;
pub mod config;
pub mod engagement;
pub mod error;
pub mod feed;
pub mod fetcher;
pub mod pagination;
pub mod projection;
pub mod session;
pub mod sidebar;
pub mod surface;
pub mod trending;
pub mod types;

#[cfg(test)]
mod test_support;

pub use api::{HttpIssueApi, IssueApi};
pub use boards::{BoardEntry, GlobalBoards};
pub use cache::{CacheService, CacheStore, Cacheable, FileCacheStore, MemoryCacheStore};
pub use cache_error::CacheError;
pub use client::{CivicFeed, ExplorePage};
pub use comments::{CommentLoader, LoadState, PrefetchOutcome};
pub use config::FeedConfig;
pub use engagement::{EngagementOverlay, EngagementReconciler, ToggleOutcome};
pub use error::{FeedError, Result};
pub use feed::{ExploreFeed, FeedCard};
pub use fetcher::{CollectionFetcher, SharedQueryCache, Snapshot};
pub use pagination::{PaginationWindow, ProximityObserver};
pub use projection::{
    AllFilter, IssueFilter, PostedByFilter, Projection, ProjectionBuilder, ProjectionSpec,
    SearchFilter, SortKey, StatusFilter, StatusSetFilter, project,
};
pub use session::SessionService;
pub use sidebar::{
    MyIssuesSidebar, SIDEBAR_CACHE_KEY, SidebarEntry, SidebarPanel, SidebarView, StatusBuckets,
    ViewSource, group_by_status,
};
pub use surface::RefreshOutcome;
pub use trending::{TrendingBoard, TrendingEntry, TrendingHandle, TrendingPoller, rank_trending};
pub use types::{
    Comment, CommentId, Issue, IssueId, IssueStatus, MediaKind, MediaRef, PlaceId, PlaceRef, User,
    UserId, UserSummary,
};
