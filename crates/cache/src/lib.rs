//! Media Grid Cache Library
//!
//! Bounded preview cache keyed by resolved preview location, with LRU
//! eviction and coalescing of in-flight loads.

pub mod config;
pub mod loader;
pub mod preview;

pub use config::{CacheConfig, ConfigError};
pub use loader::{LoadError, PreviewHandle, PreviewKey, PreviewLoader};
pub use preview::{CacheEntry, CacheStats, EntryState, PreviewCache, DEFAULT_CAPACITY};
