use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache entry '{key}' has schema version {found}, expected {expected}")]
    VersionMismatch {
        key: String,
        expected: u32,
        found: u32,
    },

    #[error("invalid cache key '{0}'")]
    InvalidKey(String),

    #[error("cannot determine a cache directory for this platform")]
    NoCacheDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("failed to persist cache entry: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub type Result<T> = std::result::Result<T, CacheError>;
