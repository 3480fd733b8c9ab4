//! Parking lot for sequential readers between kernel read requests.
//!
//! The kernel reads a file as a run of consecutive requests. After serving
//! one, the reader is parked under `(identifier, next offset)` so the
//! following request continues the stream instead of regenerating the file
//! from the segment start. Entries older than the TTL are dropped by a
//! background sweeper.

use crate::config::ReadCacheConfig;
use fakedatafs_content::SequentialReader;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

type CacheKey = (u64, u64);

struct CacheEntry {
    reader: SequentialReader,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant, ttl: std::time::Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) > ttl
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReadCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub parked: u64,
    pub rejected: u64,
    pub evicted: u64,
    pub size: usize,
}

struct Inner {
    entries: HashMap<CacheKey, CacheEntry>,
    stats: ReadCacheStats,
}

pub struct ReadCache {
    inner: Mutex<Inner>,
    config: ReadCacheConfig,
}

impl ReadCache {
    pub fn new(config: ReadCacheConfig) -> Self {
        ReadCache {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                stats: ReadCacheStats::default(),
            }),
            config,
        }
    }

    pub fn config(&self) -> &ReadCacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the reader parked at `(identifier, offset)`, if any.
    pub fn get(&self, identifier: u64, offset: u64) -> Option<SequentialReader> {
        let mut inner = self.lock();
        match inner.entries.remove(&(identifier, offset)) {
            Some(entry) => {
                inner.stats.hits += 1;
                inner.stats.size = inner.entries.len();
                trace!(identifier, offset, "read cache hit");
                Some(entry.reader)
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Parks `reader` under `(identifier, offset)`. The first reader stored
    /// under a key wins; a later one is dropped and `false` is returned.
    pub fn put(&self, identifier: u64, offset: u64, reader: SequentialReader) -> bool {
        let now = Instant::now();
        let mut inner = self.lock();
        if inner.entries.contains_key(&(identifier, offset)) {
            inner.stats.rejected += 1;
            trace!(identifier, offset, "read cache slot taken, dropping reader");
            return false;
        }
        inner.entries.insert(
            (identifier, offset),
            CacheEntry {
                reader,
                inserted_at: now,
            },
        );
        inner.stats.parked += 1;
        inner.stats.size = inner.entries.len();
        true
    }

    /// Drops every entry parked for longer than the TTL.
    pub fn evict(&self) -> usize {
        self.evict_at(Instant::now())
    }

    fn evict_at(&self, now: Instant) -> usize {
        let ttl = self.config.ttl();
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired(now, ttl));
        let removed = before - inner.entries.len();
        inner.stats.evicted += removed as u64;
        inner.stats.size = inner.entries.len();
        removed
    }

    pub fn stats(&self) -> ReadCacheStats {
        self.lock().stats.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}

/// Runs `evict` every sweep interval until `shutdown` is cancelled.
pub fn spawn_sweeper(cache: Arc<ReadCache>, shutdown: CancellationToken) -> JoinHandle<()> {
    let period = cache.config.sweep_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("read cache sweeper stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let removed = cache.evict();
                    if removed > 0 {
                        debug!(removed, remaining = cache.len(), "read cache sweep");
                    }
                }
            }
        }
    })
}
