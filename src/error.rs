use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("invalid status '{0}'")]
    InvalidStatus(String),

    #[error("invalid media kind '{0}'")]
    InvalidMediaKind(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("unexpected response shape from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl FeedError {
    /// True for failures of the network path itself (unreachable, timeout,
    /// non-success status) as opposed to a body that could not be read.
    pub fn is_transport(&self) -> bool {
        matches!(self, FeedError::Http(_) | FeedError::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
