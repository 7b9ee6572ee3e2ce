//! Bounded preview cache with LRU eviction and coalesced loads
//!
//! Every preview reference (direct render or prefetch) goes through
//! [`PreviewCache::get_or_start`]. The first request for a key creates a
//! `Pending` entry and spawns exactly one load; later requests for the same
//! key are hits on that placeholder. When the load settles, the entry is
//! updated in place, so anyone re-reading the key sees the terminal state.

use crate::loader::{LoadError, PreviewHandle, PreviewKey, PreviewLoader};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Default number of entries kept before LRU eviction kicks in
pub const DEFAULT_CAPACITY: usize = 500;

/// Lifecycle of a cache entry.
///
/// `Pending` moves to `Loaded` or `Errored` exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    Pending,
    Loaded(PreviewHandle),
    Errored(LoadError),
}

impl EntryState {
    pub fn is_pending(&self) -> bool {
        matches!(self, EntryState::Pending)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, EntryState::Loaded(_))
    }

    pub fn is_errored(&self) -> bool {
        matches!(self, EntryState::Errored(_))
    }

    /// The loaded handle, if any. Pending and errored entries both render as
    /// the fallback visual.
    pub fn handle(&self) -> Option<&PreviewHandle> {
        match self {
            EntryState::Loaded(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Snapshot of a cache entry returned to callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: PreviewKey,
    pub state: EntryState,
}

/// Statistics about cache usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries currently in cache (any state)
    pub entry_count: usize,

    /// Maximum number of entries
    pub capacity: usize,

    /// Number of requests that found an existing entry
    pub hits: u64,

    /// Number of requests that created a new entry
    pub misses: u64,

    /// Number of underlying loads dispatched
    pub loads_started: u64,

    /// Number of loads that settled as `Loaded`
    pub loads_completed: u64,

    /// Number of loads that settled as `Errored`
    pub loads_failed: u64,

    /// Number of entries evicted due to capacity pressure
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

type LoadTask = Shared<BoxFuture<'static, EntryState>>;

struct Slot {
    state: EntryState,
    inflight: Option<LoadTask>,
}

/// Internal cache state
struct CacheState {
    entries: HashMap<PreviewKey, Slot>,

    /// LRU queue (most recently used at back, least recently used at front)
    lru_queue: VecDeque<PreviewKey>,

    capacity: usize,

    /// Bumped by `clear()`; lets the prefetch queue notice a collection switch
    epoch: u64,

    stats: CacheStats,
}

impl CacheState {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru_queue: VecDeque::new(),
            capacity,
            epoch: 0,
            stats: CacheStats {
                capacity,
                ..Default::default()
            },
        }
    }

    /// Move a key to the back of the LRU queue (mark as most recently used)
    fn touch(&mut self, key: &PreviewKey) {
        if let Some(pos) = self.lru_queue.iter().position(|k| k == key) {
            self.lru_queue.remove(pos);
        }
        self.lru_queue.push_back(key.clone());
    }

    fn evict_lru(&mut self) -> Option<PreviewKey> {
        let key = self.lru_queue.pop_front()?;
        if self.entries.remove(&key).is_some() {
            self.stats.evictions += 1;
            self.stats.entry_count = self.entries.len();
            log::debug!("evicted preview {key}");
        }
        Some(key)
    }

    /// Evict entries until `incoming` more would fit under the capacity
    fn evict_to_fit(&mut self, incoming: usize) {
        while self.entries.len() + incoming > self.capacity && !self.entries.is_empty() {
            if self.evict_lru().is_none() {
                break;
            }
        }
    }

    /// Write a settled load back by key.
    ///
    /// A key that is gone (evicted or cleared) drops the result. A key that is
    /// present and still pending takes it, even if the entry was re-created
    /// after an eviction. A terminal entry is never overwritten.
    fn settle(&mut self, key: &PreviewKey, result: &EntryState) {
        match result {
            EntryState::Errored(err) => {
                self.stats.loads_failed += 1;
                log::warn!("preview load failed for {key}: {err}");
            }
            _ => self.stats.loads_completed += 1,
        }

        match self.entries.get_mut(key) {
            Some(slot) if slot.state.is_pending() => {
                slot.state = result.clone();
                slot.inflight = None;
            }
            Some(_) => {}
            None => log::debug!("dropping settled load for uncached preview {key}"),
        }
    }
}

/// Bounded preview cache with LRU eviction
///
/// Cloning yields another handle onto the same cache. Load completions are
/// written back through the shared state, so the cache can be handed to the
/// prefetch scheduler and to render code at the same time.
///
/// Loads are spawned with `tokio::spawn`, so `get_or_start` must be called
/// from within a tokio runtime.
///
/// # Example
///
/// ```no_run
/// use futures::FutureExt;
/// use mediagrid_cache::{PreviewCache, PreviewHandle, PreviewKey};
///
/// # async fn demo() {
/// let cache = PreviewCache::new(500, |_key: &PreviewKey| {
///     async { Ok(PreviewHandle::new(1, 1, vec![0u8; 4])) }.boxed()
/// });
///
/// let entry = cache.get_or_start(&"thumbs/a.jpg".into());
/// assert!(entry.state.is_pending());
///
/// let settled = cache.load(&"thumbs/a.jpg".into()).await;
/// assert!(settled.is_loaded());
/// # }
/// ```
#[derive(Clone)]
pub struct PreviewCache {
    state: Arc<Mutex<CacheState>>,
    loader: Arc<dyn PreviewLoader>,
}

impl PreviewCache {
    /// Create a cache holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize, loader: impl PreviewLoader + 'static) -> Self {
        Self::with_loader(capacity, Arc::new(loader))
    }

    pub fn with_loader(capacity: usize, loader: Arc<dyn PreviewLoader>) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::new(capacity.max(1)))),
            loader,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the entry for `key`, starting a load if it is not cached.
    ///
    /// Never blocks on I/O. A hit refreshes the entry's recency.
    pub fn get_or_start(&self, key: &PreviewKey) -> CacheEntry {
        self.acquire(key).0
    }

    /// Resolve `key` to a terminal state, joining any in-flight load.
    pub async fn load(&self, key: &PreviewKey) -> EntryState {
        let (entry, waiter) = self.acquire(key);
        let Some(waiter) = waiter else {
            return entry.state;
        };

        let settled = waiter.await;
        match self.peek(key) {
            Some(state) if !state.is_pending() => state,
            _ => settled,
        }
    }

    fn acquire(&self, key: &PreviewKey) -> (CacheEntry, Option<LoadTask>) {
        let mut state = self.lock();

        if let Some(slot) = state.entries.get(key) {
            let entry = CacheEntry {
                key: key.clone(),
                state: slot.state.clone(),
            };
            let waiter = slot.inflight.clone();
            state.touch(key);
            state.stats.hits += 1;
            return (entry, waiter);
        }

        state.stats.misses += 1;
        state.evict_to_fit(1);

        let task = self.spawn_load(key);
        state.stats.loads_started += 1;
        state.entries.insert(
            key.clone(),
            Slot {
                state: EntryState::Pending,
                inflight: Some(task.clone()),
            },
        );
        state.touch(key);
        state.stats.entry_count = state.entries.len();

        (
            CacheEntry {
                key: key.clone(),
                state: EntryState::Pending,
            },
            Some(task),
        )
    }

    fn spawn_load(&self, key: &PreviewKey) -> LoadTask {
        let pending = self.loader.load(key);
        let shared_state = Arc::clone(&self.state);
        let key = key.clone();

        let task = async move {
            let result = match pending.await {
                Ok(handle) => EntryState::Loaded(handle),
                Err(err) => EntryState::Errored(err),
            };
            shared_state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .settle(&key, &result);
            result
        }
        .boxed()
        .shared();

        // Detached: the load finishes even if every caller loses interest.
        tokio::spawn(task.clone());
        task
    }

    /// Read an entry's state without touching recency or statistics
    pub fn peek(&self, key: &PreviewKey) -> Option<EntryState> {
        self.lock().entries.get(key).map(|slot| slot.state.clone())
    }

    /// Check if a key is cached (any state) without updating LRU tracking
    pub fn contains(&self, key: &PreviewKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Remove one entry. An in-flight load for it keeps running and its
    /// result is dropped unless the key is requested again first.
    pub fn remove(&self, key: &PreviewKey) -> Option<EntryState> {
        let mut state = self.lock();
        let slot = state.entries.remove(key)?;
        state.lru_queue.retain(|k| k != key);
        state.stats.entry_count = state.entries.len();
        Some(slot.state)
    }

    /// Drop every entry, e.g. when the active collection changes.
    ///
    /// Also moves the cache epoch forward, which invalidates any preload
    /// queue filled against the previous contents.
    pub fn clear(&self) {
        let mut state = self.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        state.lru_queue.clear();
        state.epoch += 1;
        state.stats.entry_count = 0;
        log::info!("preview cache cleared ({dropped} entries)");
    }

    /// Current clear-epoch; changes every time `clear()` runs
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Change the capacity, evicting least recently used entries to fit
    pub fn set_capacity(&self, capacity: usize) {
        let mut state = self.lock();
        state.capacity = capacity.max(1);
        state.stats.capacity = state.capacity;
        state.evict_to_fit(0);
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Number of entries still waiting on their load
    pub fn pending_count(&self) -> usize {
        self.lock()
            .entries
            .values()
            .filter(|slot| slot.state.is_pending())
            .count()
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}

impl std::fmt::Debug for PreviewCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("PreviewCache")
            .field("entries", &state.entries.len())
            .field("capacity", &state.capacity)
            .field("epoch", &state.epoch)
            .finish()
    }
}
