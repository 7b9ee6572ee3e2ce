//! Preview keys, handles and the asynchronous loader seam.
//!
//! The cache never decodes images itself. A host supplies a [`PreviewLoader`]
//! that turns a resolved preview URL into a [`PreviewHandle`]; the cache only
//! tracks which keys are pending, loaded or errored.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A resolved preview location (URL or path) used as the cache key.
///
/// Entries are keyed by the resolved location rather than by record id, so
/// two records that share an image share one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewKey(String);

impl PreviewKey {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreviewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PreviewKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PreviewKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A loaded preview image, as produced by the host's loader.
///
/// Cloning is cheap: the pixel payload is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewHandle {
    /// Width of the decoded preview in pixels
    pub width: u32,

    /// Height of the decoded preview in pixels
    pub height: u32,

    /// Encoded or decoded image bytes, opaque to the cache
    pub data: Arc<[u8]>,
}

impl PreviewHandle {
    pub fn new(width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
        }
    }

    /// Get the memory size of this handle's payload in bytes
    pub fn memory_size(&self) -> usize {
        self.data.len()
    }
}

/// Reasons a preview load can fail.
///
/// A failure is terminal for the entry; the cache does not retry.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("preview not found: {0}")]
    NotFound(String),
    #[error("preview is corrupt: {0}")]
    Corrupt(String),
    #[error("preview I/O failed: {0}")]
    Io(String),
}

/// Asynchronous preview loader.
///
/// Returned futures must be `'static`: the cache spawns them and lets them run
/// to completion even if nobody is waiting on the result anymore.
pub trait PreviewLoader: Send + Sync {
    fn load(&self, key: &PreviewKey) -> BoxFuture<'static, Result<PreviewHandle, LoadError>>;
}

impl<F> PreviewLoader for F
where
    F: Fn(&PreviewKey) -> BoxFuture<'static, Result<PreviewHandle, LoadError>> + Send + Sync,
{
    fn load(&self, key: &PreviewKey) -> BoxFuture<'static, Result<PreviewHandle, LoadError>> {
        self(key)
    }
}
