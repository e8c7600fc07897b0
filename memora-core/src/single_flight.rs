use dashmap::DashMap;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::sync::Arc;

/// Per-key table of in-progress computations.
///
/// A caller that misses takes the key's flight lock before computing; callers
/// that miss on the same key meanwhile block on that lock, then re-check the
/// engine instead of computing again. A key's lock is dropped from the table
/// as soon as nobody holds or waits on it.
///
/// # Examples
///
/// ```
/// use memora_core::SingleFlight;
///
/// let flights = SingleFlight::new();
/// {
///     let _guard = flights.acquire("key");
///     assert_eq!(flights.in_flight(), 1);
/// }
/// assert_eq!(flights.in_flight(), 0);
/// ```
#[derive(Debug, Default)]
pub struct SingleFlight {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Holds a key's flight lock; releasing it lets the next waiter proceed.
pub struct FlightGuard<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
    _guard: ArcMutexGuard<RawMutex, ()>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the caller owns the flight lock for `key`.
    pub fn acquire(&self, key: &str) -> FlightGuard<'_> {
        // The shard lock is released before blocking on the flight lock.
        let lock = Arc::clone(
            self.locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        let guard = lock.lock_arc();

        FlightGuard {
            locks: &self.locks,
            key: key.to_string(),
            _guard: guard,
        }
    }

    /// Number of keys that currently have a holder or waiters.
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // One reference is the table's, one is ours; anything above is a waiter.
        self.locks
            .remove_if(self.key.as_str(), |_, lock| Arc::strong_count(lock) <= 2);
    }
}
