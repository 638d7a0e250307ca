#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use civic_feed::{
    Comment, FeedError, Issue, IssueApi, IssueId, IssueStatus, Result, User, UserId, UserSummary,
};

/// Build an issue the way the backend would deliver it.
pub fn issue(id: &str, status: IssueStatus, upvotes: u64) -> Issue {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "title": format!("Issue {id}"),
        "status": status.to_string(),
        "locality": "Ward 1",
        "upvotes": upvotes,
        "comments": 0,
    }))
    .expect("fixture issue must decode")
}

pub fn issue_by(id: &str, status: IssueStatus, upvotes: u64, user: &str) -> Issue {
    Issue {
        posted_by: Some(UserSummary {
            id: Some(UserId::new_unchecked(user)),
            name: format!("User {user}"),
            ..Default::default()
        }),
        ..issue(id, status, upvotes)
    }
}

pub fn user(id: &str) -> User {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "fullName": format!("User {id}"),
        "email": format!("{id}@example.org"),
    }))
    .expect("fixture user must decode")
}

pub fn ids(issues: &[Issue]) -> Vec<String> {
    issues.iter().map(|i| i.id.to_string()).collect()
}

/// In-process backend with call counters and switchable failures.
pub struct ScriptedApi {
    issues: Mutex<Vec<Issue>>,
    user: Mutex<Option<User>>,
    fail_explore: AtomicBool,
    explore_calls: AtomicUsize,
    upvote_calls: AtomicUsize,
    comment_calls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new(issues: Vec<Issue>) -> Arc<Self> {
        Arc::new(Self {
            issues: Mutex::new(issues),
            user: Mutex::new(None),
            fail_explore: AtomicBool::new(false),
            explore_calls: AtomicUsize::new(0),
            upvote_calls: AtomicUsize::new(0),
            comment_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_issues(&self, issues: Vec<Issue>) {
        *self.issues.lock() = issues;
    }

    pub fn set_user(&self, user: Option<User>) {
        *self.user.lock() = user;
    }

    pub fn fail_explore(&self, fail: bool) {
        self.fail_explore.store(fail, Ordering::SeqCst);
    }

    pub fn explore_calls(&self) -> usize {
        self.explore_calls.load(Ordering::SeqCst)
    }

    pub fn upvote_calls(&self) -> usize {
        self.upvote_calls.load(Ordering::SeqCst)
    }

    pub fn comment_calls(&self) -> usize {
        self.comment_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IssueApi for ScriptedApi {
    async fn explore(&self) -> Result<Vec<Issue>> {
        self.explore_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_explore.load(Ordering::SeqCst) {
            return Err(FeedError::Other("backend unavailable".to_string()));
        }
        Ok(self.issues.lock().clone())
    }

    async fn comments(&self, _issue: &IssueId) -> Result<Vec<Comment>> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn toggle_upvote(&self, _issue: &IssueId) -> Result<()> {
        self.upvote_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>> {
        Ok(self.user.lock().clone())
    }
}

/// Canned response for one `METHOD /path` route.
#[derive(Clone)]
pub struct StubResponse {
    pub status: u16,
    pub body: String,
}

impl StubResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

/// Minimal HTTP/1.1 server answering from a route table, one request per
/// connection. Records every request head it receives.
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl StubServer {
    pub async fn start(routes: Vec<(&str, &str, StubResponse)>) -> Self {
        let routes: HashMap<String, StubResponse> = routes
            .into_iter()
            .map(|(method, path, response)| (format!("{method} {path}"), response))
            .collect();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        let task = tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                loop {
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&buf[..n]);
                    if head.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let head = String::from_utf8_lossy(&head).to_string();
                let request_line = head.lines().next().unwrap_or_default();
                let route = request_line
                    .rsplit_once(' ')
                    .map(|(route, _version)| route.to_string())
                    .unwrap_or_default();
                recorded.lock().push(head.clone());

                let response = routes
                    .get(&route)
                    .cloned()
                    .unwrap_or_else(|| StubResponse::raw(404, "{}"));
                let reply = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response.status,
                    response.body.len(),
                    response.body
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            base_url,
            requests,
            task,
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
