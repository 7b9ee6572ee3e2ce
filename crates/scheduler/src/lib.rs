//! Media Grid Scheduler Library
//!
//! Background prefetching for the preview cache.
//!
//! The [`PreloadWindow`] turns the rows currently on screen into a set of
//! record indices worth warming, and the [`PrefetchScheduler`] feeds the
//! matching preview keys to the cache in small, paced batches.
//!
//! # Example
//!
//! ```no_run
//! use futures::FutureExt;
//! use mediagrid_cache::{PreviewCache, PreviewHandle, PreviewKey};
//! use mediagrid_scheduler::{PrefetchConfig, PrefetchScheduler, PreloadWindow};
//!
//! # async fn demo() {
//! let cache = PreviewCache::new(500, |_key: &PreviewKey| {
//!     async { Ok(PreviewHandle::new(1, 1, vec![0u8; 4])) }.boxed()
//! });
//! let scheduler = PrefetchScheduler::new(cache, PrefetchConfig::default());
//!
//! // Rows 10..=14 are visible in a 4-column grid of 2,000 records
//! let keys = PreloadWindow::default().keys(10, 14, 4, 2_000, |i| {
//!     Some(PreviewKey::new(format!("thumbs/{i}.jpg")))
//! });
//! scheduler.enqueue(keys);
//! # }
//! ```

mod prefetch;
mod preload;

pub use prefetch::{PrefetchConfig, PrefetchScheduler, PrefetchStats};
pub use preload::PreloadWindow;
