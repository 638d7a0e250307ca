//! Read-only view of the external session service.

use std::sync::Arc;

use crate::api::IssueApi;
use crate::types::User;

#[derive(Clone)]
pub struct SessionService {
    api: Arc<dyn IssueApi>,
}

impl SessionService {
    pub fn new(api: Arc<dyn IssueApi>) -> Self {
        Self { api }
    }

    /// The signed-in user, or `None` when signed out or unreachable.
    pub async fn current_user(&self) -> Option<User> {
        match self.api.current_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("Could not determine current user: {e}");
                None
            }
        }
    }
}
