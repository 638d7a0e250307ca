//! Entry point for embedding shells: builds every surface from one
//! configuration and mounts the explore page.

use std::sync::Arc;

use crate::api::{HttpIssueApi, IssueApi};
use crate::boards::GlobalBoards;
use crate::cache::{CacheService, FileCacheStore};
use crate::comments::CommentLoader;
use crate::config::FeedConfig;
use crate::engagement::EngagementReconciler;
use crate::error::Result;
use crate::feed::ExploreFeed;
use crate::fetcher::{CollectionFetcher, SharedQueryCache};
use crate::session::SessionService;
use crate::sidebar::{MyIssuesSidebar, SidebarView};
use crate::surface::RefreshOutcome;
use crate::trending::{TrendingHandle, TrendingPoller};
use crate::types::User;

pub struct CivicFeed {
    config: FeedConfig,
    api: Arc<dyn IssueApi>,
    shared: Option<Arc<SharedQueryCache>>,
    cache: CacheService,
}

impl CivicFeed {
    /// HTTP backend plus an on-disk cache. Falls back to an in-memory cache
    /// when no cache directory can be determined.
    pub fn from_config(config: FeedConfig) -> Result<Self> {
        config.validate()?;
        let api: Arc<dyn IssueApi> = Arc::new(HttpIssueApi::from_config(&config)?);

        let cache = match FileCacheStore::from_dir(config.resolved_cache_dir()) {
            Ok(store) => CacheService::new(Arc::new(store)),
            Err(e) => {
                tracing::warn!("Persistent cache unavailable, using memory: {e}");
                CacheService::in_memory()
            }
        };

        Ok(Self::with_api(config, api, cache))
    }

    pub fn with_api(config: FeedConfig, api: Arc<dyn IssueApi>, cache: CacheService) -> Self {
        let shared = config
            .shared_cache_ttl()
            .map(|ttl| Arc::new(SharedQueryCache::new(ttl)));
        Self {
            config,
            api,
            shared,
            cache,
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Fetcher sharing this client's read-through collection cache.
    pub fn fetcher(&self) -> CollectionFetcher {
        let fetcher = CollectionFetcher::new(Arc::clone(&self.api));
        match &self.shared {
            Some(shared) => fetcher.with_shared_cache(Arc::clone(shared)),
            None => fetcher,
        }
    }

    pub fn session(&self) -> SessionService {
        SessionService::new(Arc::clone(&self.api))
    }

    pub fn explore_feed(&self) -> ExploreFeed {
        let engagement = Arc::new(EngagementReconciler::new(Arc::clone(&self.api)));
        let comments = Arc::new(CommentLoader::new(
            Arc::clone(&self.api),
            Arc::clone(&engagement),
        ));
        ExploreFeed::new(self.fetcher(), engagement, comments, self.config.batch_size)
    }

    pub fn my_issues_sidebar(&self) -> MyIssuesSidebar {
        MyIssuesSidebar::new(
            self.fetcher(),
            self.cache.clone(),
            self.config.sidebar_bucket_limit,
        )
    }

    pub fn trending_poller(&self) -> TrendingPoller {
        TrendingPoller::new(
            self.fetcher(),
            self.config.trending_interval(),
            self.config.trending_limit,
        )
    }

    pub async fn global_boards(&self) -> GlobalBoards {
        GlobalBoards::load(&self.fetcher(), self.config.board_limit).await
    }

    /// Mount every explore-page surface.
    ///
    /// The sidebar paints its persisted entry before anything is fetched;
    /// the feed, sidebar and boards then load concurrently and the trending
    /// poller starts. Must be called within a tokio runtime.
    pub async fn mount_explore_page(&self) -> ExplorePage {
        let user = self.session().current_user().await;

        let feed = self.explore_feed();
        let sidebar = self.my_issues_sidebar();
        let painted = sidebar.mount(user.clone());
        tracing::debug!("Sidebar painted before fetch: {}", painted != SidebarView::Hidden);

        let (feed_outcome, sidebar_outcome, boards) = futures::join!(
            feed.load(),
            sidebar.refresh(),
            self.global_boards()
        );
        tracing::debug!("Explore page mounted (feed: {feed_outcome:?}, sidebar: {sidebar_outcome:?})");

        ExplorePage {
            user,
            feed,
            sidebar,
            boards,
            trending: self.trending_poller().start(),
            sidebar_outcome,
        }
    }
}

/// Every surface of a mounted explore page.
pub struct ExplorePage {
    pub user: Option<User>,
    pub feed: ExploreFeed,
    pub sidebar: MyIssuesSidebar,
    pub boards: GlobalBoards,
    pub trending: TrendingHandle,
    sidebar_outcome: RefreshOutcome,
}

impl ExplorePage {
    /// Outcome of the sidebar's first refresh.
    pub fn sidebar_outcome(&self) -> RefreshOutcome {
        self.sidebar_outcome
    }

    /// Detach observers, stop the poller and discard in-flight results.
    pub fn unmount(&self) {
        self.feed.unmount();
        self.sidebar.unmount();
        self.trending.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::{FakeApi, issue, issue_by, user};
    use crate::types::IssueStatus;

    fn config() -> FeedConfig {
        FeedConfig {
            shared_cache_ttl_ms: 5_000,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_explore_page_coalesces_fetches() {
        let api = FakeApi::with_issues(vec![
            issue_by("1", IssueStatus::Open, 3, "u1"),
            issue("2", IssueStatus::InProgress, 8),
            issue("3", IssueStatus::Closed, 1),
        ]);
        api.set_user(Some(user("u1")));
        let client = CivicFeed::with_api(config(), api.clone(), CacheService::in_memory());

        let page = client.mount_explore_page().await;
        let mut trending = page.trending.subscribe();
        trending.changed().await.unwrap();

        assert_eq!(page.feed.revealed_count(), 2);
        assert_eq!(page.boards.ongoing.len(), 1);
        assert_eq!(page.boards.recently_closed.len(), 1);
        assert_eq!(page.sidebar_outcome(), RefreshOutcome::Applied);
        assert_eq!(page.trending.latest().entries.len(), 3);
        assert_eq!(api.explore_calls(), 1, "surfaces share one request");

        page.unmount();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.explore_calls(), 1);
        assert_eq!(page.sidebar.view(), SidebarView::Hidden);
    }

    #[tokio::test]
    async fn test_signed_out_page_hides_sidebar() {
        let api = FakeApi::with_issues(vec![issue("1", IssueStatus::Open, 3)]);
        let client = CivicFeed::with_api(config(), api, CacheService::in_memory());

        let page = client.mount_explore_page().await;
        assert!(page.user.is_none());
        assert_eq!(page.sidebar_outcome(), RefreshOutcome::Skipped);
        assert_eq!(page.sidebar.view(), SidebarView::Hidden);
        page.unmount();
    }

    #[test]
    fn test_shared_cache_follows_config() {
        let api = FakeApi::new();
        let disabled = FeedConfig {
            shared_cache_ttl_ms: 0,
            ..Default::default()
        };
        let client = CivicFeed::with_api(disabled, api, CacheService::in_memory());
        assert!(client.shared.is_none());
    }
}
