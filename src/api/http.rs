//! reqwest-backed implementation of [`IssueApi`].
//!
//! Authentication is cookie based: when a session cookie is configured it is
//! attached to every request as a sensitive header, so it never shows up in
//! reqwest's debug output.

use std::fmt;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use crate::config::FeedConfig;
use crate::error::{FeedError, Result};
use crate::types::{Comment, Issue, IssueId, User};

use super::IssueApi;
use super::decode::{decode_collection, decode_comments};

/// HTTP client for the civic issue backend
pub struct HttpIssueApi {
    client: Client,
    base_url: Url,
    session_cookie: Option<SecretString>,
}

impl HttpIssueApi {
    /// Create a client from configuration.
    ///
    /// Uses the configured connect and total timeouts; no retries are layered
    /// on top.
    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        default_headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url()?,
            session_cookie: config.session_cookie.clone(),
        })
    }

    /// Build an endpoint URL below the base URL, escaping each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                FeedError::Config(format!("'{}' cannot be used as a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let builder = self.client.request(method, url);
        let Some(cookie) = &self.session_cookie else {
            return Ok(builder);
        };

        let mut value = HeaderValue::from_str(cookie.expose_secret())
            .map_err(|_| FeedError::Config("session cookie is not a valid header value".to_string()))?;
        value.set_sensitive(true);
        Ok(builder.header(header::COOKIE, value))
    }

    /// Send a request and return the response once its status is known to
    /// be a success.
    async fn send(&self, method: Method, segments: &[&str]) -> Result<reqwest::Response> {
        let url = self.endpoint(segments)?;
        let endpoint = url.path().to_string();

        let response = self.request(method, url)?.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status { endpoint, status });
        }
        Ok(response)
    }

    async fn get_json(&self, segments: &[&str]) -> Result<(String, Value)> {
        let response = self.send(Method::GET, segments).await?;
        let endpoint = response.url().path().to_string();
        let bytes = response.bytes().await?;

        let body = serde_json::from_slice(&bytes).map_err(|e| FeedError::Decode {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;
        Ok((endpoint, body))
    }
}

impl fmt::Debug for HttpIssueApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpIssueApi")
            .field("base_url", &self.base_url.as_str())
            .field(
                "session_cookie",
                &self.session_cookie.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[async_trait]
impl IssueApi for HttpIssueApi {
    async fn explore(&self) -> Result<Vec<Issue>> {
        let (endpoint, body) = self.get_json(&["issues", "explore"]).await?;
        decode_collection(&endpoint, body)
    }

    async fn comments(&self, issue: &IssueId) -> Result<Vec<Comment>> {
        let (endpoint, body) = self
            .get_json(&["issues", issue.as_str(), "comments"])
            .await?;
        decode_comments(&endpoint, body)
    }

    async fn toggle_upvote(&self, issue: &IssueId) -> Result<()> {
        self.send(Method::POST, &["issues", issue.as_str(), "upvote"])
            .await?;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>> {
        let (endpoint, body) = match self.get_json(&["users", "me"]).await {
            Ok(found) => found,
            Err(FeedError::Status { status, .. })
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
            {
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if body.is_null() {
            return Ok(None);
        }
        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| FeedError::Decode {
                endpoint,
                reason: e.to_string(),
            })
    }
}
