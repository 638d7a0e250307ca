//! Backend access for the issue feed.
//!
//! The feed core only ever talks to the backend through [`IssueApi`], so
//! surfaces can be driven by the HTTP client in production and by a scripted
//! fake in tests.

pub mod decode;
pub mod http;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Comment, Issue, IssueId, User};

pub use http::HttpIssueApi;

/// Collection endpoint shared by every surface.
pub const EXPLORE_PATH: &str = "/issues/explore";

/// Common interface for the issue backend
#[async_trait]
pub trait IssueApi: Send + Sync {
    /// `GET /issues/explore`: every issue in scope, all statuses, unpaged.
    async fn explore(&self) -> Result<Vec<Issue>>;

    /// `GET /issues/{id}/comments`: the full comment list for one issue.
    async fn comments(&self, issue: &IssueId) -> Result<Vec<Comment>>;

    /// `POST /issues/{id}/upvote`: toggles the session user's upvote. The
    /// response body is not consulted.
    async fn toggle_upvote(&self, issue: &IssueId) -> Result<()>;

    /// `GET /users/me`: the signed-in user, or `None` without a session.
    async fn current_user(&self) -> Result<Option<User>>;
}
