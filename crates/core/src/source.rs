//! Collaborator traits supplied by the host application.
//!
//! The core never talks to storage directly. Records arrive in pages from a
//! [`PagedRecordSource`], stored asset references are turned into loadable
//! keys by an [`AssetResolver`], and sprite metadata JSON comes from a
//! [`SpriteMetadataStore`].

use crate::error::SourceError;
use crate::record::Record;
use futures::future::BoxFuture;
use mediagrid_cache::PreviewKey;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ordering requested from the record source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
    Name,
    LongestFirst,
}

/// Filter and sort applied to the record source.
///
/// Changing the query invalidates every loaded page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    pub filter: Option<String>,
    pub sort: SortOrder,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        self.filter = (!filter.trim().is_empty()).then_some(filter);
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }
}

/// A request for one page of records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Index of the first record requested
    pub offset: usize,
    /// Maximum number of records requested
    pub limit: usize,
    pub query: Query,
    /// Feed generation the request was issued under
    pub generation: u64,
}

/// One page of records plus the source's current total
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub records: Vec<Record>,
    pub total: usize,
}

impl Page {
    pub fn new(records: Vec<Record>, total: usize) -> Self {
        Self { records, total }
    }
}

/// Paged access to the collection's records
pub trait PagedRecordSource: Send + Sync {
    fn fetch(&self, request: &PageRequest) -> BoxFuture<'static, Result<Page, SourceError>>;
}

/// Turns stored asset references into loadable preview keys.
///
/// Resolution is pure and synchronous. A `None` means the record has no
/// usable asset and should show a placeholder.
pub trait AssetResolver: Send + Sync {
    fn resolve(&self, root: &Path, reference: &str) -> Option<PreviewKey>;

    /// Key of the JSON metadata describing a sprite sheet.
    ///
    /// Defaults to the sheet's own key with a `.json` extension.
    fn sprite_metadata(&self, root: &Path, reference: &str) -> Option<PreviewKey> {
        let image = self.resolve(root, reference)?;
        let location = image.as_str();
        let stem = match location.rfind('.') {
            Some(dot) if !location[dot..].contains('/') => &location[..dot],
            _ => location,
        };
        Some(PreviewKey::new(format!("{stem}.json")))
    }
}

/// Resolves references against the collection root on the local filesystem.
///
/// Absolute paths and URLs with a scheme pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileResolver;

impl AssetResolver for FileResolver {
    fn resolve(&self, root: &Path, reference: &str) -> Option<PreviewKey> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if reference.contains("://") || Path::new(reference).is_absolute() {
            return Some(PreviewKey::new(reference));
        }
        Some(PreviewKey::new(root.join(reference).to_string_lossy()))
    }
}

/// Source of sprite sheet metadata as raw JSON text
pub trait SpriteMetadataStore: Send + Sync {
    fn fetch(&self, key: &PreviewKey) -> BoxFuture<'static, Result<String, SourceError>>;
}

impl<F> SpriteMetadataStore for F
where
    F: Fn(&PreviewKey) -> BoxFuture<'static, Result<String, SourceError>> + Send + Sync,
{
    fn fetch(&self, key: &PreviewKey) -> BoxFuture<'static, Result<String, SourceError>> {
        self(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_file_resolver_joins_relative_references() {
        let root = PathBuf::from("/media/library");
        let key = FileResolver.resolve(&root, "thumbs/a.jpg").unwrap();
        assert_eq!(key.as_str(), "/media/library/thumbs/a.jpg");
    }

    #[test]
    fn test_file_resolver_passes_through_urls_and_absolute_paths() {
        let root = PathBuf::from("/media/library");
        assert_eq!(
            FileResolver.resolve(&root, "https://cdn/a.jpg").unwrap().as_str(),
            "https://cdn/a.jpg"
        );
        assert_eq!(
            FileResolver.resolve(&root, "/other/a.jpg").unwrap().as_str(),
            "/other/a.jpg"
        );
    }

    #[test]
    fn test_file_resolver_rejects_empty_reference() {
        assert!(FileResolver.resolve(Path::new("/lib"), "  ").is_none());
    }

    #[test]
    fn test_sprite_metadata_key_swaps_extension() {
        let root = PathBuf::from("/lib");
        let key = FileResolver.sprite_metadata(&root, "sprites/a.sheet.jpg").unwrap();
        assert_eq!(key.as_str(), "/lib/sprites/a.sheet.json");

        let key = FileResolver.sprite_metadata(&root, "sprites.d/sheet").unwrap();
        assert_eq!(key.as_str(), "/lib/sprites.d/sheet.json");
    }

    #[test]
    fn test_blank_filter_is_no_filter() {
        assert_eq!(Query::new().with_filter("   ").filter, None);
        assert_eq!(Query::new().with_filter("cat").filter.as_deref(), Some("cat"));
    }
}
