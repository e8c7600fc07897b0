use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// What happened on one pass through a memoized call.
///
/// A call records exactly one of `Hit` or `Miss` when it reaches the
/// function body or the cache, plus one failure event per engine error it
/// ran into on the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheEvent {
    /// The engine returned a stored value.
    Hit,
    /// The function ran.
    Miss,
    /// `get` failed.
    LookupFailed,
    /// `set` failed or was rejected (e.g. an expiry the engine does not accept).
    StoreFailed,
}

impl CacheEvent {
    const ALL: [CacheEvent; 4] = [
        CacheEvent::Hit,
        CacheEvent::Miss,
        CacheEvent::LookupFailed,
        CacheEvent::StoreFailed,
    ];

    fn slot(self) -> usize {
        match self {
            CacheEvent::Hit => 0,
            CacheEvent::Miss => 1,
            CacheEvent::LookupFailed => 2,
            CacheEvent::StoreFailed => 3,
        }
    }
}

/// Live counters of one memoized function.
///
/// Every [`Memoize`](crate::Memoize) owns one, shared by its clones. Failure
/// counters make a misconfigured engine visible: a function whose results
/// are never stored shows `store_failures` growing alongside `misses`.
///
/// # Examples
///
/// ```
/// use memora_core::{CacheEvent, CacheStats};
///
/// let stats = CacheStats::new();
/// stats.record(CacheEvent::Miss);
/// stats.record(CacheEvent::StoreFailed);
/// stats.record(CacheEvent::Miss);
///
/// let snapshot = stats.snapshot();
/// assert_eq!(snapshot.misses(), 2);
/// assert_eq!(snapshot.store_failures(), 1);
/// assert_eq!(snapshot.hit_rate(), 0.0);
/// ```
#[derive(Debug, Default)]
pub struct CacheStats {
    counters: [AtomicU64; 4],
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record(&self, event: CacheEvent) {
        self.counters[event.slot()].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count(&self, event: CacheEvent) -> u64 {
        self.counters[event.slot()].load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> u64 {
        self.count(CacheEvent::Hit)
    }

    pub fn misses(&self) -> u64 {
        self.count(CacheEvent::Miss)
    }

    pub fn lookup_failures(&self) -> u64 {
        self.count(CacheEvent::LookupFailed)
    }

    pub fn store_failures(&self) -> u64 {
        self.count(CacheEvent::StoreFailed)
    }

    /// Reads every counter. Counters are read one by one, so a snapshot taken
    /// under concurrent calls may be off by the calls in flight.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            lookup_failures: self.lookup_failures(),
            store_failures: self.store_failures(),
        }
    }

    pub fn reset(&self) {
        for event in CacheEvent::ALL {
            self.counters[event.slot()].store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time copy of a [`CacheStats`], serializable for export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    hits: u64,
    misses: u64,
    lookup_failures: u64,
    store_failures: u64,
}

impl StatsSnapshot {
    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn lookup_failures(&self) -> u64 {
        self.lookup_failures
    }

    pub fn store_failures(&self) -> u64 {
        self.store_failures
    }

    /// Calls answered from the cache or by running the function.
    pub fn total_accesses(&self) -> u64 {
        self.hits + self.misses
    }

    /// Engine errors of either kind.
    pub fn engine_failures(&self) -> u64 {
        self.lookup_failures + self.store_failures
    }

    /// Ratio of hits to accesses, `0.0` before the first access.
    pub fn hit_rate(&self) -> f64 {
        match self.total_accesses() {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }

    /// Ratio of misses to accesses, `0.0` before the first access.
    pub fn miss_rate(&self) -> f64 {
        match self.total_accesses() {
            0 => 0.0,
            total => self.misses as f64 / total as f64,
        }
    }
}
