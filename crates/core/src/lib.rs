//! Media Grid Core Library
//!
//! Session state for browsing a large media collection in a virtualized
//! grid: the paged record feed, viewport windowing, hover sprite scrubbing,
//! multi-selection and optimistic tagging. Previews are served by
//! `mediagrid-cache` and warmed by `mediagrid-scheduler`.

pub mod browser;
pub mod config;
pub mod error;
pub mod feed;
pub mod grid;
pub mod record;
pub mod selection;
pub mod source;
pub mod sprite;
pub mod tags;

pub use browser::{Collaborators, MediaBrowser, ViewportUpdate};
pub use config::BrowserConfig;
pub use error::{ConfigError, FeedError, SourceError, SpriteError};
pub use feed::{PagingConfig, RecordFeed};
pub use grid::{column_count, compute_window, GridMetrics, Rect, RowRange, Size, ViewportWindow, Window};
pub use record::{Dimensions, Record, RecordId, Tag, TagState};
pub use selection::{RealizedOrder, Selection};
pub use source::{
    AssetResolver, FileResolver, Page, PageRequest, PagedRecordSource, Query, SortOrder,
    SpriteMetadataStore,
};
pub use sprite::{
    display_scale, frame_index, FrameView, ScrubState, SessionId, SpriteAssets, SpriteLibrary,
    SpriteMetadata, SpriteScrubber, SpriteSource,
};
pub use tags::TagChange;
