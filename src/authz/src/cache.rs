//! TTL cache with per-key loaders
//!
//! Shields the engine from the slow configuration source. Each key owns a slot
//! guarded by an async mutex, so:
//!
//! - concurrent misses on one key run a single load and share its result
//! - readers never see a half-written entry; entries are replaced wholesale
//! - callers queued behind a load share its outcome, error included
//! - a failed load leaves the slot empty and the next call retries
//!
//! Time comes from an injectable [`Clock`] so expiry can be tested without
//! sleeping.

use dashmap::DashMap;
use std::any::Any;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Time source for cache expiry
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.offset_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

/// Cached value with its expiry
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

type SharedError = Arc<dyn Any + Send + Sync>;

#[derive(Debug)]
struct SlotState<V> {
    entry: Option<CacheEntry<V>>,
    /// Error of the most recent load, handed to callers that queued behind it
    failure: Option<SharedError>,
}

impl<V> Default for SlotState<V> {
    fn default() -> Self {
        Self {
            entry: None,
            failure: None,
        }
    }
}

#[derive(Debug)]
struct Slot<V> {
    /// Completed loads; bumped under the lock
    loads: AtomicU64,
    state: Mutex<SlotState<V>>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            loads: AtomicU64::new(0),
            state: Mutex::new(SlotState::default()),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    load_failures: AtomicU64,
    shared_failures: AtomicU64,
}

/// Generic TTL cache keyed by `K`
pub struct TtlCache<K, V> {
    slots: DashMap<K, Arc<Slot<V>>>,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache on the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a cache on a custom clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: DashMap::new(),
            clock,
            counters: Counters::default(),
        }
    }

    /// Return the cached value for `key`, or run `loader` and cache its result
    /// for `ttl`
    ///
    /// One load runs per miss even under concurrent callers. Callers that
    /// were already waiting when the load finished share its outcome, error
    /// included. Errors are never cached: a call made after a failed load
    /// completes runs the loader again.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: K,
        ttl: Duration,
        loader: F,
    ) -> Result<V, Arc<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        let slot = self.slots.entry(key).or_default().clone();
        let seen = slot.loads.load(Ordering::Acquire);
        let mut state = slot.state.lock().await;

        if let Some(cached) = state.entry.as_ref() {
            if !cached.is_expired(self.clock.now()) {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(cached.value.clone());
            }
            self.counters.expirations.fetch_add(1, Ordering::Relaxed);
            state.entry = None;
        }

        if slot.loads.load(Ordering::Acquire) != seen {
            if let Some(failure) = state.failure.clone() {
                if let Ok(error) = failure.downcast::<E>() {
                    self.counters.shared_failures.fetch_add(1, Ordering::Relaxed);
                    return Err(error);
                }
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let outcome = match loader().await {
            Ok(value) => {
                state.entry = Some(CacheEntry {
                    value: value.clone(),
                    expires_at: self.clock.now() + ttl,
                });
                state.failure = None;
                Ok(value)
            }
            Err(e) => {
                self.counters.load_failures.fetch_add(1, Ordering::Relaxed);
                let error = Arc::new(e);
                state.failure = Some(error.clone() as SharedError);
                Err(error)
            }
        };

        slot.loads.fetch_add(1, Ordering::Release);
        outcome
    }

    /// Current unexpired value for `key`, without loading
    pub async fn get(&self, key: &K) -> Option<V> {
        let slot = self.slots.get(key).map(|s| s.value().clone())?;
        let state = slot.state.lock().await;
        state
            .entry
            .as_ref()
            .filter(|cached| !cached.is_expired(self.clock.now()))
            .map(|cached| cached.value.clone())
    }

    /// Drop the entry for `key`
    pub fn invalidate(&self, key: &K) {
        self.slots.remove(key);
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            load_failures: self.counters.load_failures.load(Ordering::Relaxed),
            shared_failures: self.counters.shared_failures.load(Ordering::Relaxed),
            keys: self.slots.len(),
        }
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    /// Loads that returned an error
    pub load_failures: u64,
    /// Callers that received the error of a load they waited on
    pub shared_failures: u64,
    pub keys: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
