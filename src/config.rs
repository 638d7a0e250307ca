//! Feed configuration.
//!
//! Configuration is read from a YAML file (by default `config.yaml` in the
//! platform config directory) and includes:
//! - Backend base URL and HTTP timeouts
//! - Page, board and ranking sizes
//! - Trending poll interval and the shared query cache TTL
//! - Location of the persisted sidebar cache
//!
//! `CIVIC_FEED_API_URL` and `CIVIC_FEED_SESSION_COOKIE` override the file.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{FeedError, Result};

pub const API_URL_ENV: &str = "CIVIC_FEED_API_URL";
pub const SESSION_COOKIE_ENV: &str = "CIVIC_FEED_SESSION_COOKIE";

const DEFAULT_API_URL: &str = "https://civic-monitor.onrender.com";

/// Main configuration structure
#[derive(Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Backend base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Total request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Connect timeout in seconds (default: 10)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Items revealed per page of the explore feed (default: 5)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Seconds between trending refreshes (default: 15)
    #[serde(default = "default_trending_interval")]
    pub trending_interval_secs: u64,

    /// Size of the trending ranking (default: 5)
    #[serde(default = "default_trending_limit")]
    pub trending_limit: usize,

    /// Size of each global status board (default: 6)
    #[serde(default = "default_board_limit")]
    pub board_limit: usize,

    /// Issues kept per status bucket in the "my issues" sidebar (default: 3)
    #[serde(default = "default_sidebar_bucket_limit")]
    pub sidebar_bucket_limit: usize,

    /// TTL of the shared collection cache in milliseconds; 0 disables it
    #[serde(default = "default_shared_cache_ttl")]
    pub shared_cache_ttl_ms: u64,

    /// Directory holding persisted cache entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Session cookie sent with every request. Only ever taken from the
    /// environment; never read from or written to the file.
    #[serde(skip)]
    pub session_cookie: Option<SecretString>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_batch_size() -> usize {
    5
}

fn default_trending_interval() -> u64 {
    15
}

fn default_trending_limit() -> usize {
    5
}

fn default_board_limit() -> usize {
    6
}

fn default_sidebar_bucket_limit() -> usize {
    3
}

fn default_shared_cache_ttl() -> u64 {
    5_000
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            batch_size: default_batch_size(),
            trending_interval_secs: default_trending_interval(),
            trending_limit: default_trending_limit(),
            board_limit: default_board_limit(),
            sidebar_bucket_limit: default_sidebar_bucket_limit(),
            shared_cache_ttl_ms: default_shared_cache_ttl(),
            cache_dir: None,
            session_cookie: None,
        }
    }
}

impl fmt::Debug for FeedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedConfig")
            .field("api_url", &self.api_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("batch_size", &self.batch_size)
            .field("trending_interval_secs", &self.trending_interval_secs)
            .field("trending_limit", &self.trending_limit)
            .field("board_limit", &self.board_limit)
            .field("sidebar_bucket_limit", &self.sidebar_bucket_limit)
            .field("shared_cache_ttl_ms", &self.shared_cache_ttl_ms)
            .field("cache_dir", &self.cache_dir)
            .field(
                "session_cookie",
                &self.session_cookie.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl FeedConfig {
    /// Default config file location for this platform, if one exists.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Load configuration from file, or return defaults if not found.
    /// Environment overrides are applied either way.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)?;
            serde_yaml_ng::from_str(&content)?
        } else {
            FeedConfig::default()
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = env::var(API_URL_ENV)
            && !url.is_empty()
        {
            self.api_url = url;
        }

        if let Ok(cookie) = env::var(SESSION_COOKIE_ENV)
            && !cookie.is_empty()
        {
            self.session_cookie = Some(SecretString::from(cookie));
        }
    }

    /// Reject values that would make a surface render nothing forever or
    /// spin its poller.
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("batch_size", self.batch_size),
            ("trending_limit", self.trending_limit),
            ("board_limit", self.board_limit),
            ("sidebar_bucket_limit", self.sidebar_bucket_limit),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(FeedError::Config(format!("{name} must be greater than 0")));
            }
        }

        if self.trending_interval_secs == 0 {
            return Err(FeedError::Config(
                "trending_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.shared_cache_ttl_ms >= self.trending_interval_secs.saturating_mul(1000) {
            return Err(FeedError::Config(format!(
                "shared_cache_ttl_ms ({}) must be shorter than the trending interval ({}s)",
                self.shared_cache_ttl_ms, self.trending_interval_secs
            )));
        }

        self.base_url()?;
        Ok(())
    }

    /// Parsed backend base URL.
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.api_url)?;
        if url.cannot_be_a_base() {
            return Err(FeedError::Config(format!(
                "api_url '{}' cannot be used as a base URL",
                self.api_url
            )));
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn trending_interval(&self) -> Duration {
        Duration::from_secs(self.trending_interval_secs)
    }

    /// `None` when the shared collection cache is disabled.
    pub fn shared_cache_ttl(&self) -> Option<Duration> {
        (self.shared_cache_ttl_ms > 0).then(|| Duration::from_millis(self.shared_cache_ttl_ms))
    }

    /// Directory for persisted cache entries: the configured one, else the
    /// platform cache directory.
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.cache_dir().to_path_buf()))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "civic-monitor", "civic-feed")
}
