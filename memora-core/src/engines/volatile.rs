use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::{CacheEngine, CacheEntry, CacheError, Expiry, Result};

/// Unbounded concurrent engine honoring the expiry of each `set`.
///
/// Unlike [`InMemoryEngine`](crate::InMemoryEngine) there is no global ttl:
/// every entry keeps the expiry it was stored with, `None` meaning it never
/// expires. Expired entries are dropped on access, by
/// [`purge_expired`](Self::purge_expired), and by a sweep that runs every
/// [`DEFAULT_SWEEP_INTERVAL`] stores (see
/// [`with_sweep_interval`](Self::with_sweep_interval)). Entries whose key is
/// never read again are therefore reclaimed too.
///
/// Backed by a sharded [`DashMap`], so lookups on different keys rarely
/// contend.
///
/// # Examples
///
/// ```
/// use memora_core::{CacheEngine, VolatileEngine};
/// use std::time::Duration;
///
/// let engine = VolatileEngine::new();
/// engine.set("session", "token".to_string(), Some(Duration::from_secs(300))).unwrap();
/// engine.set("config", "v1".to_string(), None).unwrap();
///
/// assert_eq!(engine.get("session").unwrap().as_deref(), Some("token"));
/// assert_eq!(engine.len(), 2);
/// ```
#[derive(Debug)]
pub struct VolatileEngine<V> {
    entries: DashMap<String, CacheEntry<V>>,
    stores: AtomicUsize,
    sweep_interval: usize,
}

/// Stores between two sweeps of expired entries.
pub const DEFAULT_SWEEP_INTERVAL: usize = 1024;

impl<V> VolatileEngine<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            stores: AtomicUsize::new(0),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Sweeps expired entries every `interval` stores (at least 1).
    pub fn with_sweep_interval(mut self, interval: usize) -> Self {
        self.sweep_interval = interval.max(1);
        self
    }

    pub fn sweep_interval(&self) -> usize {
        self.sweep_interval
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "purged expired entries");
        }
        removed
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<V> Default for VolatileEngine<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> CacheEngine<V> for VolatileEngine<V>
where
    V: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Result<Option<V>> {
        // The shard guard must be released before removing.
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired());
            debug!(key = %key, "removed expired entry");
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: V, expiry: Expiry) -> Result<()> {
        if expiry == Some(Duration::ZERO) {
            return Err(CacheError::InvalidExpiry(
                "expiry must be greater than zero".to_string(),
            ));
        }
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, expiry));

        let stores = self.stores.fetch_add(1, Ordering::Relaxed) + 1;
        if stores % self.sweep_interval == 0 {
            self.purge_expired();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_per_call_expiry() {
        let engine = VolatileEngine::new();
        engine
            .set("short", 1, Some(Duration::from_millis(40)))
            .unwrap();
        engine.set("long", 2, Some(Duration::from_secs(60))).unwrap();
        engine.set("forever", 3, None).unwrap();

        thread::sleep(Duration::from_millis(70));

        assert_eq!(engine.get("short").unwrap(), None);
        assert_eq!(engine.get("long").unwrap(), Some(2));
        assert_eq!(engine.get("forever").unwrap(), Some(3));
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn test_zero_expiry_is_rejected() {
        let engine = VolatileEngine::new();
        let result = engine.set("k", 1, Some(Duration::ZERO));
        assert!(matches!(result, Err(CacheError::InvalidExpiry(_))));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let engine = VolatileEngine::new();
        for i in 0..5 {
            engine
                .set(&format!("k{}", i), i, Some(Duration::from_millis(20)))
                .unwrap();
        }
        engine.set("keep", 99, None).unwrap();

        thread::sleep(Duration::from_millis(50));
        assert_eq!(engine.purge_expired(), 5);
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_overwrite_resets_expiry() {
        let engine = VolatileEngine::new();
        engine.set("k", 1, Some(Duration::from_millis(30))).unwrap();
        engine.set("k", 2, None).unwrap();

        thread::sleep(Duration::from_millis(50));
        assert_eq!(engine.get("k").unwrap(), Some(2));
    }

    #[test]
    fn test_sweep_reclaims_keys_never_read_again() {
        let engine = VolatileEngine::new().with_sweep_interval(16);
        for i in 0..1000u64 {
            engine
                .set(&format!("old{}", i), i, Some(Duration::from_millis(1)))
                .unwrap();
        }

        thread::sleep(Duration::from_millis(20));
        for i in 0..32u64 {
            engine
                .set(&format!("new{}", i), i, Some(Duration::from_secs(60)))
                .unwrap();
        }

        // At least one sweep ran after every "old" entry had expired.
        assert!(engine.len() <= 32, "len = {}", engine.len());
        assert_eq!(engine.get("new31").unwrap(), Some(31));
    }

    #[test]
    fn test_memoized_churn_stays_bounded() {
        use crate::{Args, Memoize};
        use std::sync::Arc;

        let engine = Arc::new(VolatileEngine::new().with_sweep_interval(64));
        let memo: Memoize<u64> =
            Memoize::new(Arc::clone(&engine)).with_expiry(Some(Duration::from_millis(1)));

        for n in 0..1000u64 {
            memo.get_or_compute("double", &Args::new().arg(&n), || n * 2)
                .unwrap();
        }
        thread::sleep(Duration::from_millis(20));
        for n in 1000..1064u64 {
            memo.get_or_compute("double", &Args::new().arg(&n), || n * 2)
                .unwrap();
        }

        assert!(engine.len() <= 64, "len = {}", engine.len());
    }

    #[test]
    fn test_zero_sweep_interval_is_clamped() {
        let engine: VolatileEngine<u8> = VolatileEngine::new().with_sweep_interval(0);
        assert_eq!(engine.sweep_interval(), 1);
        assert_eq!(VolatileEngine::<u8>::new().sweep_interval(), DEFAULT_SWEEP_INTERVAL);
    }

    #[test]
    fn test_clear() {
        let engine = VolatileEngine::new();
        engine.set("a", 1, None).unwrap();
        engine.clear();
        assert_eq!(engine.get("a").unwrap(), None);
    }
}
