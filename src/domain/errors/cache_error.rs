//! Local read-marker cache error types.

use thiserror::Error;

/// Local cache error variants.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to access cache file: {0}")]
    Io(String),

    #[error("failed to encode cache contents: {0}")]
    Serialize(String),

    #[error("failed to decode cache contents: {0}")]
    Deserialize(String),

    #[error("local cache not available: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
