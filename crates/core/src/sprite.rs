//! Sprite sheet hover scrubbing
//!
//! A sprite sheet packs evenly sized frames of a video into a grid. While the
//! pointer hovers over an item, its horizontal position picks the frame to
//! show. Loading is per hover session; anything that goes wrong drops the
//! session into [`ScrubState::Fallback`], where the host keeps showing the
//! static preview.

use crate::error::SpriteError;
use crate::grid::Size;
use crate::source::SpriteMetadataStore;
use futures::future::{BoxFuture, FutureExt, Shared};
use log::debug;
use mediagrid_cache::{PreviewHandle, PreviewKey, PreviewLoader};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Layout of a sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteMetadata {
    /// Frames per sheet row
    #[serde(alias = "cols")]
    pub columns: u32,

    #[serde(alias = "frameCount", alias = "frames")]
    pub frame_count: u32,

    #[serde(alias = "tileWidth")]
    pub tile_width: u32,

    #[serde(alias = "tileHeight")]
    pub tile_height: u32,
}

impl SpriteMetadata {
    pub fn new(columns: u32, frame_count: u32, tile_width: u32, tile_height: u32) -> Self {
        Self {
            columns,
            frame_count,
            tile_width,
            tile_height,
        }
    }

    /// Parses and validates metadata JSON.
    pub fn from_json(json: &str) -> Result<Self, SpriteError> {
        let metadata: SpriteMetadata = serde_json::from_str(json)?;
        metadata.validate()?;
        Ok(metadata)
    }

    pub fn validate(&self) -> Result<(), SpriteError> {
        if self.columns == 0 {
            return Err(SpriteError::Invalid("columns must be positive"));
        }
        if self.frame_count == 0 {
            return Err(SpriteError::Invalid("frame_count must be positive"));
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(SpriteError::Invalid("tile size must be positive"));
        }
        Ok(())
    }

    pub fn rows(&self) -> u32 {
        self.frame_count.div_ceil(self.columns.max(1))
    }

    /// Frame under pointer position `x` on a surface `width` wide
    pub fn frame_at(&self, x: f32, width: f32) -> u32 {
        frame_index(x, width, self.frame_count)
    }

    /// Pixel offset of `frame` within the sheet
    pub fn tile_offset(&self, frame: u32) -> (u32, u32) {
        let columns = self.columns.max(1);
        let frame = frame.min(self.frame_count.saturating_sub(1));
        (
            (frame % columns) * self.tile_width,
            (frame / columns) * self.tile_height,
        )
    }

    /// Everything needed to draw the frame under `x` on `surface`.
    pub fn frame_view(&self, x: f32, surface: Size) -> FrameView {
        let frame = self.frame_at(x, surface.width);
        let (offset_x, offset_y) = self.tile_offset(frame);
        FrameView {
            frame,
            offset_x,
            offset_y,
            scale: display_scale(surface, self.tile_width, self.tile_height),
        }
    }
}

/// Maps a pointer position to a frame index.
///
/// `x` is clamped to the surface, so positions past either edge map to the
/// first or last frame.
pub fn frame_index(x: f32, width: f32, frame_count: u32) -> u32 {
    if frame_count == 0 {
        return 0;
    }
    let percentage = if width.is_finite() && width > 0.0 && !x.is_nan() {
        (f64::from(x) / f64::from(width)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let frame = (percentage * f64::from(frame_count)).floor() as u32;
    frame.min(frame_count - 1)
}

/// Uniform scale that fits one tile inside `surface`
pub fn display_scale(surface: Size, tile_width: u32, tile_height: u32) -> f32 {
    if tile_width == 0 || tile_height == 0 {
        return 0.0;
    }
    let scale = (surface.width / tile_width as f32).min(surface.height / tile_height as f32);
    if scale.is_finite() {
        scale.max(0.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameView {
    pub frame: u32,
    /// Tile offset within the sheet, in sheet pixels
    pub offset_x: u32,
    pub offset_y: u32,
    pub scale: f32,
}

/// Where to find a sprite sheet and its metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpriteSource {
    pub image: PreviewKey,
    pub metadata: PreviewKey,
}

/// Both halves of a loaded sprite sheet
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteAssets {
    pub metadata: SpriteMetadata,
    pub image: PreviewHandle,
}

/// Token identifying one hover session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum ScrubState {
    Idle,
    Loading {
        session: SessionId,
        metadata: Option<SpriteMetadata>,
        image: Option<PreviewHandle>,
    },
    Ready {
        session: SessionId,
        assets: SpriteAssets,
    },
    /// Sprite unavailable; keep showing the static preview
    Fallback { session: SessionId },
}

/// Per-item hover state machine.
#[derive(Debug, Clone)]
pub struct SpriteScrubber {
    state: ScrubState,
    next_session: u64,
    surface: Size,
    current: Option<FrameView>,
}

impl Default for SpriteScrubber {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteScrubber {
    pub fn new() -> Self {
        Self {
            state: ScrubState::Idle,
            next_session: 0,
            surface: Size::default(),
            current: None,
        }
    }

    pub fn state(&self) -> &ScrubState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ScrubState::Ready { .. })
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.state, ScrubState::Fallback { .. })
    }

    /// Frame most recently selected by pointer movement
    pub fn current_frame(&self) -> Option<FrameView> {
        self.current
    }

    pub fn session(&self) -> Option<SessionId> {
        match &self.state {
            ScrubState::Idle => None,
            ScrubState::Loading { session, .. }
            | ScrubState::Ready { session, .. }
            | ScrubState::Fallback { session } => Some(*session),
        }
    }

    /// Starts a hover session. Items without a sprite go straight to
    /// fallback.
    pub fn hover_start(&mut self, has_sprite: bool, surface: Size) -> SessionId {
        self.next_session += 1;
        let session = SessionId(self.next_session);
        self.surface = surface;
        self.current = None;
        self.state = if has_sprite {
            ScrubState::Loading {
                session,
                metadata: None,
                image: None,
            }
        } else {
            ScrubState::Fallback { session }
        };
        session
    }

    /// Ends the session; late results for it are ignored.
    pub fn hover_end(&mut self) {
        self.state = ScrubState::Idle;
        self.current = None;
    }

    pub fn resize(&mut self, surface: Size) {
        self.surface = surface;
    }

    pub fn metadata_loaded(
        &mut self,
        session: SessionId,
        result: Result<SpriteMetadata, SpriteError>,
    ) {
        let result = result.and_then(|metadata| metadata.validate().map(|()| metadata));
        self.deliver(session, result.map(Part::Metadata));
    }

    pub fn image_loaded(&mut self, session: SessionId, result: Result<PreviewHandle, SpriteError>) {
        self.deliver(session, result.map(Part::Image));
    }

    /// Delivers both halves at once, as produced by [`SpriteLibrary::prepare`].
    pub fn assets_loaded(&mut self, session: SessionId, result: Result<SpriteAssets, SpriteError>) {
        match result {
            Ok(assets) => {
                self.metadata_loaded(session, Ok(assets.metadata));
                self.image_loaded(session, Ok(assets.image));
            }
            Err(err) => self.deliver(session, Err(err)),
        }
    }

    fn deliver(&mut self, session: SessionId, part: Result<Part, SpriteError>) {
        let ScrubState::Loading {
            session: current,
            metadata,
            image,
        } = &mut self.state
        else {
            return;
        };
        if *current != session {
            debug!("Dropping sprite result for ended session {:?}", session);
            return;
        }
        match part {
            Ok(Part::Metadata(m)) => *metadata = Some(m),
            Ok(Part::Image(i)) => *image = Some(i),
            Err(err) => {
                debug!("Sprite unavailable, using static preview: {}", err);
                self.state = ScrubState::Fallback { session };
                return;
            }
        }
        if metadata.is_none() || image.is_none() {
            return;
        }
        if let (Some(metadata), Some(image)) = (metadata.take(), image.take()) {
            self.state = ScrubState::Ready {
                session,
                assets: SpriteAssets { metadata, image },
            };
        }
    }

    /// Updates the frame for pointer position `x`. Ignored unless ready.
    pub fn pointer_move(&mut self, x: f32) -> Option<FrameView> {
        let ScrubState::Ready { assets, .. } = &self.state else {
            return None;
        };
        let view = assets.metadata.frame_view(x, self.surface);
        self.current = Some(view);
        Some(view)
    }
}

enum Part {
    Metadata(SpriteMetadata),
    Image(PreviewHandle),
}

type MetadataFuture = Shared<BoxFuture<'static, Result<SpriteMetadata, SpriteError>>>;

/// Memoised sprite loading.
///
/// Metadata is fetched and validated once per distinct key; concurrent
/// requests share one fetch and failures are remembered too. Sheet images
/// go through the host's loader on every session.
#[derive(Clone)]
pub struct SpriteLibrary {
    store: Arc<dyn SpriteMetadataStore>,
    images: Arc<dyn PreviewLoader>,
    metadata: Arc<Mutex<HashMap<PreviewKey, MetadataFuture>>>,
}

impl SpriteLibrary {
    pub fn new(store: Arc<dyn SpriteMetadataStore>, images: Arc<dyn PreviewLoader>) -> Self {
        Self {
            store,
            images,
            metadata: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn metadata(&self, key: &PreviewKey) -> Result<SpriteMetadata, SpriteError> {
        let fut = {
            let mut memo = self.metadata.lock().unwrap_or_else(PoisonError::into_inner);
            memo.entry(key.clone())
                .or_insert_with(|| {
                    debug!("Fetching sprite metadata {}", key);
                    let fetch = self.store.fetch(key);
                    async move {
                        let json = fetch.await?;
                        SpriteMetadata::from_json(&json)
                    }
                    .boxed()
                    .shared()
                })
                .clone()
        };
        fut.await
    }

    pub async fn image(&self, key: &PreviewKey) -> Result<PreviewHandle, SpriteError> {
        Ok(self.images.load(key).await?)
    }

    /// Loads metadata and sheet concurrently.
    pub async fn prepare(&self, source: &SpriteSource) -> Result<SpriteAssets, SpriteError> {
        let (metadata, image) =
            futures::join!(self.metadata(&source.metadata), self.image(&source.image));
        Ok(SpriteAssets {
            metadata: metadata?,
            image: image?,
        })
    }

    /// Number of distinct metadata keys seen
    pub fn memoised(&self) -> usize {
        self.metadata
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Forgets memoised metadata, e.g. when switching collections.
    pub fn clear(&self) {
        self.metadata
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl std::fmt::Debug for SpriteLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpriteLibrary")
            .field("memoised", &self.memoised())
            .finish()
    }
}
