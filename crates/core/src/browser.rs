//! Browsing session facade.
//!
//! [`MediaBrowser`] wires the feed, viewport window, preview cache, prefetch
//! scheduler, sprite library and selection together for one collection. The
//! host drives it with viewport events and page responses and reads back
//! windows, preview entries and tag changes.
//!
//! Methods that may start background loads (`on_viewport`, `preview`) must be
//! called from within a tokio runtime.

use crate::config::BrowserConfig;
use crate::error::{FeedError, SourceError};
use crate::feed::RecordFeed;
use crate::grid::{Size, ViewportWindow, Window};
use crate::record::{RecordId, Tag};
use crate::selection::Selection;
use crate::source::{
    AssetResolver, Page, PageRequest, PagedRecordSource, Query, SpriteMetadataStore,
};
use crate::sprite::{SessionId, SpriteLibrary, SpriteScrubber, SpriteSource};
use crate::tags::TagChange;
use log::{debug, info};
use mediagrid_cache::{CacheEntry, PreviewCache, PreviewKey, PreviewLoader};
use mediagrid_scheduler::{PrefetchConfig, PrefetchScheduler, PreloadWindow};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// External services a browser depends on
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn PagedRecordSource>,
    pub resolver: Arc<dyn AssetResolver>,
    pub previews: Arc<dyn PreviewLoader>,
    pub sprite_metadata: Arc<dyn SpriteMetadataStore>,
}

/// Result of a viewport change
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportUpdate {
    pub window: Window,
    /// Next page to fetch, if the window came close enough to the end
    pub page_request: Option<PageRequest>,
    /// Preview keys newly queued for prefetch
    pub prefetched: usize,
}

pub struct MediaBrowser {
    config: BrowserConfig,
    root: PathBuf,
    source: Arc<dyn PagedRecordSource>,
    resolver: Arc<dyn AssetResolver>,
    feed: RecordFeed,
    viewport: ViewportWindow,
    preload: PreloadWindow,
    scheduler: PrefetchScheduler,
    sprites: SpriteLibrary,
    selection: Selection,
    last_window: Option<Window>,
}

impl MediaBrowser {
    pub fn new(config: BrowserConfig, collaborators: Collaborators) -> Self {
        let cache = PreviewCache::with_loader(config.cache.capacity, collaborators.previews.clone());
        let scheduler = PrefetchScheduler::new(cache, PrefetchConfig::from_config(&config.cache));
        Self {
            root: PathBuf::new(),
            source: collaborators.source,
            resolver: collaborators.resolver,
            feed: RecordFeed::new(config.paging),
            viewport: ViewportWindow::new(config.grid),
            preload: PreloadWindow::from_config(&config.cache),
            scheduler,
            sprites: SpriteLibrary::new(collaborators.sprite_metadata, collaborators.previews),
            selection: Selection::new(),
            last_window: None,
            config,
        }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn feed(&self) -> &RecordFeed {
        &self.feed
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn viewport(&self) -> &ViewportWindow {
        &self.viewport
    }

    pub fn cache(&self) -> &PreviewCache {
        self.scheduler.cache()
    }

    pub fn scheduler(&self) -> &PrefetchScheduler {
        &self.scheduler
    }

    pub fn sprites(&self) -> &SpriteLibrary {
        &self.sprites
    }

    /// Window from the most recent viewport update
    pub fn last_window(&self) -> Option<&Window> {
        self.last_window.as_ref()
    }

    /// Switches to another collection.
    ///
    /// Every cached preview, queued prefetch and memoised sprite belongs to
    /// the old root and is dropped. Returns the first page request.
    pub fn switch_library(&mut self, root: impl Into<PathBuf>) -> PageRequest {
        self.root = root.into();
        info!("Switching library to {}", self.root.display());
        self.scheduler.clear();
        self.sprites.clear();
        self.selection.exit_mode();
        self.last_window = None;
        self.feed.reset(Query::default())
    }

    /// Applies a new filter or sort. Selection is cleared since the realized
    /// order is about to change.
    pub fn set_query(&mut self, query: Query) -> PageRequest {
        debug!("Query changed: {:?}", query);
        self.selection.clear();
        self.last_window = None;
        self.feed.reset(query)
    }

    /// Recomputes the window and kicks off pagination and prefetch.
    pub fn on_viewport(&mut self, container: Size, scroll_offset: f32) -> ViewportUpdate {
        let window = self.viewport.update(container, scroll_offset, self.feed.len());
        let page_request = self.feed.maybe_request(&window);

        let prefetched = match (window.visible.first(), window.visible.last()) {
            (Some(first), Some(last)) => {
                let keys = self.preload.keys(
                    first,
                    last,
                    window.columns,
                    window.record_count,
                    |index| self.preview_key(index),
                );
                self.scheduler.enqueue(keys)
            }
            _ => 0,
        };

        self.last_window = Some(window);
        ViewportUpdate {
            window,
            page_request,
            prefetched,
        }
    }

    /// Resolved preview key for the record at `index`
    pub fn preview_key(&self, index: usize) -> Option<PreviewKey> {
        let reference = self.feed.get(index)?.preview.as_deref()?;
        self.resolver.resolve(&self.root, reference)
    }

    /// Cache entry for the record at `index`, starting its load if needed.
    ///
    /// `None` means the record has no preview and a placeholder should be
    /// drawn.
    pub fn preview(&self, index: usize) -> Option<CacheEntry> {
        let key = self.preview_key(index)?;
        Some(self.cache().get_or_start(&key))
    }

    pub fn sprite_source(&self, index: usize) -> Option<SpriteSource> {
        let record = self.feed.get(index)?;
        if !record.has_sprite() {
            return None;
        }
        let reference = record.sprite.as_deref()?;
        Some(SpriteSource {
            image: self.resolver.resolve(&self.root, reference)?,
            metadata: self.resolver.sprite_metadata(&self.root, reference)?,
        })
    }

    /// Starts a hover session on `scrubber` for the record at `index`.
    ///
    /// Returns the session and what to load for it; the host passes
    /// [`SpriteLibrary::prepare`]'s result to
    /// [`SpriteScrubber::assets_loaded`]. Records without a usable sprite
    /// put the scrubber into fallback and return `None`.
    pub fn begin_scrub(
        &self,
        scrubber: &mut SpriteScrubber,
        index: usize,
        surface: Size,
    ) -> Option<(SessionId, SpriteSource)> {
        let source = self.sprite_source(index);
        let session = scrubber.hover_start(source.is_some(), surface);
        source.map(|source| (session, source))
    }

    pub fn apply_page(
        &mut self,
        request: &PageRequest,
        result: Result<Page, SourceError>,
    ) -> Result<usize, FeedError> {
        self.feed.apply(request, result)
    }

    /// Fetches `request` from the record source and applies the response.
    pub async fn fetch_page(&mut self, request: PageRequest) -> Result<usize, FeedError> {
        let result = self.source.fetch(&request).await;
        self.apply_page(&request, result)
    }

    /// Re-issues the page that failed last.
    pub fn retry(&mut self) -> Option<PageRequest> {
        self.feed.retry()
    }

    pub fn click(&mut self, index: usize, extend: bool) -> bool {
        self.selection.click(index, extend, &self.feed)
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(&self.feed);
    }

    pub fn exit_selection(&mut self) {
        self.selection.exit_mode();
    }

    pub fn set_tag(&mut self, index: usize, tag: Tag, value: bool) -> Option<TagChange> {
        let id = self.feed.get(index)?.id.clone();
        self.feed.set_tag(&id, tag, value)
    }

    /// Sets `tag` on every selected record, in realized order.
    pub fn tag_selection(&mut self, tag: Tag, value: bool) -> Vec<TagChange> {
        let ids: Vec<RecordId> = self.selection.ordered_ids(&self.feed);
        ids.iter()
            .filter_map(|id| self.feed.set_tag(id, tag, value))
            .collect()
    }

    pub fn revert_tag(&mut self, change: &TagChange) -> bool {
        self.feed.revert(change)
    }
}

impl std::fmt::Debug for MediaBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBrowser")
            .field("root", &self.root)
            .field("records", &self.feed.len())
            .field("total", &self.feed.total())
            .field("selected", &self.selection.len())
            .field("cache", &self.cache().len())
            .finish()
    }
}
