//! Trending poller: a self-refreshing top-N ranking.
//!
//! Polls immediately on start, then on a fixed interval. Every poll replaces
//! the whole ranking, and a failed poll publishes an empty one rather than
//! leaving the previous ranking on screen. Only the first poll may be served
//! from the shared query cache; later polls always reach the backend.

use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::fetcher::CollectionFetcher;
use crate::projection::ProjectionSpec;
use crate::types::{Issue, IssueId};

/// Shortest accepted polling interval.
pub const MIN_TRENDING_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendingEntry {
    /// 1-based position
    pub rank: usize,
    pub id: IssueId,
    pub title: String,
    pub upvotes: u64,
}

/// Rank every issue by upvotes; ties keep collection order.
pub fn rank_trending(issues: &[Issue], limit: usize) -> Vec<TrendingEntry> {
    ProjectionSpec::trending(limit)
        .apply(issues)
        .items
        .into_iter()
        .enumerate()
        .map(|(i, issue)| TrendingEntry {
            rank: i + 1,
            id: issue.id,
            title: issue.title,
            upvotes: issue.upvote_count,
        })
        .collect()
}

/// One published ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrendingBoard {
    pub entries: Vec<TrendingEntry>,
    pub fetched_at: Option<Timestamp>,
    /// Number of polls completed so far; 0 before the first one.
    pub polls: u64,
}

pub struct TrendingPoller {
    fetcher: CollectionFetcher,
    interval: Duration,
    limit: usize,
}

impl TrendingPoller {
    /// Intervals below [`MIN_TRENDING_INTERVAL`] are raised to it.
    pub fn new(fetcher: CollectionFetcher, interval: Duration, limit: usize) -> Self {
        if interval < MIN_TRENDING_INTERVAL {
            tracing::warn!(
                "Trending interval {interval:?} is too short, using {MIN_TRENDING_INTERVAL:?}"
            );
        }
        Self {
            fetcher,
            interval: interval.max(MIN_TRENDING_INTERVAL),
            limit,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetch and rank once, possibly served from the shared cache.
    pub async fn poll_once(&self) -> Vec<TrendingEntry> {
        let snapshot = self.fetcher.fetch().await;
        rank_trending(snapshot.issues(), self.limit)
    }

    /// Fetch from the backend and rank once.
    pub async fn poll_fresh(&self) -> Vec<TrendingEntry> {
        let snapshot = self.fetcher.fetch_fresh().await;
        rank_trending(snapshot.issues(), self.limit)
    }

    /// Spawn the polling task on the current tokio runtime.
    ///
    /// Ticks that are missed while a poll is running are skipped, never
    /// queued.
    pub fn start(self) -> TrendingHandle {
        let (tx, rx) = watch::channel(TrendingBoard::default());
        let stopped = Arc::new(Mutex::new(false));
        let task_stopped = Arc::clone(&stopped);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut polls = 0;

            loop {
                ticker.tick().await;
                let entries = if polls == 0 {
                    self.poll_once().await
                } else {
                    self.poll_fresh().await
                };
                polls += 1;
                tracing::debug!("Trending poll {polls}: {} entries", entries.len());

                {
                    let stopped = task_stopped.lock();
                    if *stopped {
                        break;
                    }
                    tx.send_replace(TrendingBoard {
                        entries,
                        fetched_at: Some(Timestamp::now()),
                        polls,
                    });
                }
            }
        });

        TrendingHandle { rx, task, stopped }
    }
}

/// Owner of a running poller. Stops the poller when dropped.
pub struct TrendingHandle {
    rx: watch::Receiver<TrendingBoard>,
    task: JoinHandle<()>,
    stopped: Arc<Mutex<bool>>,
}

impl TrendingHandle {
    pub fn subscribe(&self) -> watch::Receiver<TrendingBoard> {
        self.rx.clone()
    }

    pub fn latest(&self) -> TrendingBoard {
        self.rx.borrow().clone()
    }

    /// Cancel the timer. Nothing is published once this returns.
    pub fn stop(&self) {
        *self.stopped.lock() = true;
        self.task.abort();
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }
}

impl Drop for TrendingHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
