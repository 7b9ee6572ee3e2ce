//! Media records as supplied by the paged data source.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Opaque record identifier assigned by the data source
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Pixel dimensions of the underlying media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height, `None` for degenerate sizes
    pub fn aspect_ratio(&self) -> Option<f32> {
        (self.width > 0 && self.height > 0).then(|| self.width as f32 / self.height as f32)
    }
}

/// Boolean tags a user can toggle on a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    Favorite,
    Flagged,
}

/// Tag values carried by a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagState {
    pub favorite: bool,
    pub flagged: bool,
}

impl TagState {
    pub fn get(&self, tag: Tag) -> bool {
        match tag {
            Tag::Favorite => self.favorite,
            Tag::Flagged => self.flagged,
        }
    }

    /// Set a tag, returning its previous value
    pub fn set(&mut self, tag: Tag, value: bool) -> bool {
        let slot = match tag {
            Tag::Favorite => &mut self.favorite,
            Tag::Flagged => &mut self.flagged,
        };
        std::mem::replace(slot, value)
    }
}

/// A single media item in the browsing surface.
///
/// `preview` and `sprite` are stored references relative to the collection
/// root; they are turned into loadable keys by an
/// [`AssetResolver`](crate::source::AssetResolver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub sprite: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub tags: TagState,
}

impl Record {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            preview: None,
            sprite: None,
            duration_ms: None,
            dimensions: None,
            tags: TagState::default(),
        }
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }

    pub fn with_sprite(mut self, sprite: impl Into<String>) -> Self {
        self.sprite = Some(sprite.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = Some(duration.as_millis() as u64);
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some(Dimensions::new(width, height));
        self
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_ms.map(Duration::from_millis)
    }

    pub fn has_sprite(&self) -> bool {
        self.sprite.as_deref().is_some_and(|s| !s.is_empty())
    }
}
