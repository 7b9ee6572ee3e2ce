//! Background prefetch scheduler
//!
//! Warms the preview cache ahead of visible need. Keys are queued in arrival
//! order without duplicates and drained by a single cooperative worker in
//! small batches, with a short pause between batches so prefetching never
//! crowds out loads for items that are actually on screen.

use futures::future::join_all;
use mediagrid_cache::{CacheConfig, PreviewCache, PreviewKey};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

/// Configuration for the prefetch worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchConfig {
    /// Maximum keys loaded concurrently per batch.
    /// Default: 10.
    pub batch_size: usize,

    /// Pause after each batch settles.
    /// Default: 50ms.
    pub batch_pause: Duration,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_pause: Duration::from_millis(50),
        }
    }
}

impl PrefetchConfig {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            batch_size: config.prefetch_batch_size.max(1),
            batch_pause: config.prefetch_pause(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }
}

/// Prefetch statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchStats {
    /// Keys accepted into the queue
    pub enqueued: u64,

    /// Keys ignored because they were cached or already queued
    pub skipped: u64,

    /// Batches handed to the cache
    pub batches_dispatched: u64,

    /// Keys handed to the cache
    pub keys_dispatched: u64,

    /// Queued keys dropped by a clear
    pub dropped: u64,
}

struct QueueState {
    queue: VecDeque<PreviewKey>,
    queued: HashSet<PreviewKey>,

    /// Cache epoch the queue was filled under
    epoch: u64,

    running: bool,
    stats: PrefetchStats,
}

impl QueueState {
    /// Drop the queue if the cache was cleared since it was filled
    fn sync_epoch(&mut self, cache_epoch: u64) {
        if self.epoch != cache_epoch {
            self.drain();
            self.epoch = cache_epoch;
        }
    }

    fn drain(&mut self) {
        self.stats.dropped += self.queue.len() as u64;
        self.queue.clear();
        self.queued.clear();
    }

    fn next_batch(&mut self, batch_size: usize) -> Vec<PreviewKey> {
        let n = batch_size.min(self.queue.len());
        let batch: Vec<_> = self.queue.drain(..n).collect();
        for key in &batch {
            self.queued.remove(key);
        }
        batch
    }
}

/// Prefetch scheduler feeding a [`PreviewCache`].
///
/// Cloning yields another handle onto the same queue. Each batch member goes
/// through [`PreviewCache::load`], the same path direct renders use, so keys
/// that were resolved before their batch came up cost nothing.
///
/// The worker is spawned with `tokio::spawn`; `enqueue` must be called from
/// within a tokio runtime.
#[derive(Clone)]
pub struct PrefetchScheduler {
    cache: PreviewCache,
    config: PrefetchConfig,
    state: Arc<Mutex<QueueState>>,
    idle: Arc<Notify>,
}

impl PrefetchScheduler {
    pub fn new(cache: PreviewCache, config: PrefetchConfig) -> Self {
        let epoch = cache.epoch();
        Self {
            cache,
            config,
            state: Arc::new(Mutex::new(QueueState {
                queue: VecDeque::new(),
                queued: HashSet::new(),
                epoch,
                running: false,
                stats: PrefetchStats::default(),
            })),
            idle: Arc::new(Notify::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cache(&self) -> &PreviewCache {
        &self.cache
    }

    pub fn config(&self) -> PrefetchConfig {
        self.config
    }

    /// Queue keys for background loading.
    ///
    /// Keys already in the cache (pending, loaded or errored) and keys already
    /// queued are skipped. Returns the number of keys added.
    pub fn enqueue<I>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = PreviewKey>,
    {
        let cache_epoch = self.cache.epoch();
        let mut state = self.lock();
        state.sync_epoch(cache_epoch);

        let mut added = 0;
        for key in keys {
            if state.queued.contains(&key) || self.cache.contains(&key) {
                state.stats.skipped += 1;
                continue;
            }
            state.queued.insert(key.clone());
            state.queue.push_back(key);
            added += 1;
        }
        state.stats.enqueued += added as u64;

        if added > 0 && !state.running {
            state.running = true;
            drop(state);
            log::debug!("prefetch worker started with {added} keys");
            tokio::spawn(self.clone().run());
        }

        added
    }

    async fn run(self) {
        loop {
            let batch = {
                let cache_epoch = self.cache.epoch();
                let mut state = self.lock();
                state.sync_epoch(cache_epoch);
                let batch = state.next_batch(self.config.batch_size);
                if batch.is_empty() {
                    state.running = false;
                    break;
                }
                state.stats.batches_dispatched += 1;
                state.stats.keys_dispatched += batch.len() as u64;
                batch
            };

            log::trace!("prefetching batch of {}", batch.len());
            join_all(batch.iter().map(|key| self.cache.load(key))).await;

            tokio::time::sleep(self.config.batch_pause).await;
        }

        log::debug!("prefetch worker idle");
        self.idle.notify_waiters();
    }

    /// Drop every queued key and clear the cache.
    ///
    /// Used on collection switch. Batches already dispatched keep running;
    /// their results land in the cleared cache only if re-requested.
    pub fn clear(&self) {
        self.cache.clear();
        let cache_epoch = self.cache.epoch();
        let mut state = self.lock();
        state.drain();
        state.epoch = cache_epoch;
    }

    /// Wait until the worker has drained the queue.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }

    pub fn queue_len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_queued(&self, key: &PreviewKey) -> bool {
        self.lock().queued.contains(key)
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn stats(&self) -> PrefetchStats {
        self.lock().stats
    }
}

impl std::fmt::Debug for PrefetchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("PrefetchScheduler")
            .field("queued", &state.queue.len())
            .field("running", &state.running)
            .field("config", &self.config)
            .finish()
    }
}
