//! Error types for the browsing session.

use mediagrid_cache::LoadError;
use thiserror::Error;

/// Failure reported by an external collaborator (record source, metadata store)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Outcome of applying a page response to the feed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The response belongs to an earlier query and was discarded
    #[error("stale page response (generation {received}, current {current})")]
    Stale { received: u64, current: u64 },

    /// No request with this offset is outstanding
    #[error("no outstanding request at offset {offset}")]
    NotInFlight { offset: usize },

    /// The source failed; loaded records are kept and the page can be retried
    #[error("page fetch failed: {0}")]
    Source(#[from] SourceError),
}

impl FeedError {
    /// Whether a user-initiated retry can recover from this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeedError::Source(_))
    }
}

/// Sprite sheet failures. Never surfaced to the user; they send the
/// scrubber into its fallback state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpriteError {
    #[error("sprite metadata is not valid JSON: {0}")]
    Parse(String),

    #[error("invalid sprite metadata: {0}")]
    Invalid(&'static str),

    #[error("sprite metadata unavailable: {0}")]
    Metadata(#[from] SourceError),

    #[error("sprite image failed to load: {0}")]
    Image(#[from] LoadError),
}

impl From<serde_json::Error> for SpriteError {
    fn from(err: serde_json::Error) -> Self {
        SpriteError::Parse(err.to_string())
    }
}

/// Errors loading or validating a [`BrowserConfig`](crate::config::BrowserConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Cache(#[from] mediagrid_cache::ConfigError),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
