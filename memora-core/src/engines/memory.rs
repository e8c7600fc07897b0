use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::debug;

use crate::utils::{evict_front, move_key_to_end, remove_key};
use crate::{CacheEngine, CacheEntry, CacheError, EvictionPolicy, Expiry, Result};

/// Bounded in-process engine.
///
/// Holds at most `capacity` entries and evicts according to its
/// [`EvictionPolicy`] (LRU by default) when a `set` goes over the limit.
/// The ttl is a property of the engine, fixed at construction: every entry
/// lives for the configured ttl (or forever when none is set).
///
/// Because the engine owns its ttl, `set` only accepts `None` or the
/// configured ttl itself as the per-call expiry. Any other value is rejected
/// with [`CacheError::UnsupportedExpiry`] instead of being silently ignored.
///
/// # Thread Safety
///
/// Entries live in a `parking_lot::RwLock<HashMap>` so hits only take a
/// read lock; the order queue is guarded by a separate `Mutex`. When both are
/// needed the order lock is always taken first.
///
/// # Examples
///
/// ```
/// use memora_core::{CacheEngine, EvictionPolicy, InMemoryEngine};
/// use std::time::Duration;
///
/// let engine = InMemoryEngine::new(2)
///     .with_policy(EvictionPolicy::LRU)
///     .with_ttl(Duration::from_secs(60));
///
/// engine.set("a", 1, None).unwrap();
/// engine.set("b", 2, None).unwrap();
/// engine.get("a").unwrap(); // "a" is now the most recently used
/// engine.set("c", 3, None).unwrap();
///
/// assert_eq!(engine.get("a").unwrap(), Some(1));
/// assert_eq!(engine.get("b").unwrap(), None);
/// assert_eq!(engine.get("c").unwrap(), Some(3));
///
/// // Only the engine's own ttl is accepted per call
/// assert!(engine.set("d", 4, Some(Duration::from_secs(5))).is_err());
/// assert!(engine.set("d", 4, Some(Duration::from_secs(60))).is_ok());
/// ```
#[derive(Debug)]
pub struct InMemoryEngine<V> {
    map: RwLock<HashMap<String, CacheEntry<V>>>,
    order: Mutex<VecDeque<String>>,
    capacity: usize,
    policy: EvictionPolicy,
    ttl: Expiry,
}

impl<V: Clone> InMemoryEngine<V> {
    /// Creates an engine holding at most `capacity` entries, without ttl.
    ///
    /// A capacity of zero keeps nothing: every stored entry is evicted
    /// immediately.
    pub fn new(capacity: usize) -> Self {
        Self {
            map: RwLock::new(HashMap::with_capacity(capacity.min(1024))),
            order: Mutex::new(VecDeque::new()),
            capacity,
            policy: EvictionPolicy::default(),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub fn ttl(&self) -> Expiry {
        self.ttl
    }

    /// Number of stored entries, including expired ones not yet cleaned up.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// Removes `key`, returning `true` if it was present.
    pub fn remove(&self, key: &str) -> bool {
        let mut order = self.order.lock();
        let mut map = self.map.write();
        remove_key(&mut map, &mut order, key)
    }

    pub fn clear(&self) {
        let mut order = self.order.lock();
        let mut map = self.map.write();
        map.clear();
        order.clear();
    }

    /// Evicts entries until the map fits in `capacity`.
    fn enforce_capacity(
        &self,
        map: &mut HashMap<String, CacheEntry<V>>,
        order: &mut VecDeque<String>,
    ) {
        while map.len() > self.capacity {
            let evicted = match self.policy {
                EvictionPolicy::FIFO | EvictionPolicy::LRU => evict_front(map, order),
                EvictionPolicy::Random => {
                    if order.is_empty() {
                        None
                    } else {
                        let pos = fastrand::usize(..order.len());
                        order.remove(pos).map(|key| {
                            map.remove(&key);
                            key
                        })
                    }
                }
            };

            match evicted {
                Some(key) => debug!(key = %key, policy = ?self.policy, "evicted entry"),
                None => break,
            }
        }
    }
}

impl<V> CacheEngine<V> for InMemoryEngine<V>
where
    V: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Result<Option<V>> {
        let mut expired = false;
        let result = {
            let map = self.map.read();
            match map.get(key) {
                Some(entry) if entry.is_expired() => {
                    expired = true;
                    None
                }
                Some(entry) => Some(entry.value.clone()),
                None => None,
            }
        };

        if expired {
            let mut order = self.order.lock();
            let mut map = self.map.write();
            // Re-check: a concurrent set may have refreshed the entry.
            if map.get(key).map_or(false, |entry| entry.is_expired()) {
                remove_key(&mut map, &mut order, key);
                debug!(key = %key, "removed expired entry");
            }
            return Ok(None);
        }

        if result.is_some() && self.policy == EvictionPolicy::LRU {
            move_key_to_end(&mut self.order.lock(), key);
        }

        Ok(result)
    }

    fn set(&self, key: &str, value: V, expiry: Expiry) -> Result<()> {
        if let Some(requested) = expiry {
            if self.ttl != Some(requested) {
                return Err(CacheError::UnsupportedExpiry {
                    requested,
                    configured: self.ttl,
                });
            }
        }

        let mut order = self.order.lock();
        let mut map = self.map.write();

        let replaced = map
            .insert(key.to_string(), CacheEntry::new(value, self.ttl))
            .is_some();
        if replaced {
            // Only an existing key has a slot in the queue to give up.
            if let Some(pos) = order.iter().position(|k| k == key) {
                order.remove(pos);
            }
        }
        order.push_back(key.to_string());

        self.enforce_capacity(&mut map, &mut order);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_get_missing_is_none() {
        let engine: InMemoryEngine<i32> = InMemoryEngine::new(10);
        assert_eq!(engine.get("missing").unwrap(), None);
    }

    #[test]
    fn test_set_then_get() {
        let engine = InMemoryEngine::new(10);
        engine.set("k", "value".to_string(), None).unwrap();
        assert_eq!(engine.get("k").unwrap(), Some("value".to_string()));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_overwrite_does_not_grow() {
        let engine = InMemoryEngine::new(10);
        engine.set("k", 1, None).unwrap();
        engine.set("k", 2, None).unwrap();
        assert_eq!(engine.get("k").unwrap(), Some(2));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_order_queue_tracks_map() {
        for policy in [EvictionPolicy::FIFO, EvictionPolicy::LRU, EvictionPolicy::Random] {
            let engine = InMemoryEngine::new(4).with_policy(policy);
            for round in 0..3 {
                for i in 0..6 {
                    engine.set(&format!("k{}", i), round, None).unwrap();
                }
                engine.set("k5", round, None).unwrap();
            }

            let order = engine.order.lock();
            let map = engine.map.read();
            assert_eq!(order.len(), map.len(), "{:?}", policy);
            assert_eq!(map.len(), 4);
            assert!(order.iter().all(|k| map.contains_key(k)));
            assert!(order.iter().filter(|k| *k == "k5").count() <= 1);
        }
    }

    #[test]
    fn test_fifo_evicts_oldest() {
        let engine = InMemoryEngine::new(2).with_policy(EvictionPolicy::FIFO);
        engine.set("a", 1, None).unwrap();
        engine.set("b", 2, None).unwrap();
        // Access does not matter for FIFO
        engine.get("a").unwrap();
        engine.set("c", 3, None).unwrap();

        assert_eq!(engine.get("a").unwrap(), None);
        assert_eq!(engine.get("b").unwrap(), Some(2));
        assert_eq!(engine.get("c").unwrap(), Some(3));
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let engine = InMemoryEngine::new(3);
        engine.set("a", 1, None).unwrap();
        engine.set("b", 2, None).unwrap();
        engine.set("c", 3, None).unwrap();
        engine.get("a").unwrap();
        engine.set("d", 4, None).unwrap();

        assert_eq!(engine.get("b").unwrap(), None);
        assert_eq!(engine.get("a").unwrap(), Some(1));
        assert_eq!(engine.get("c").unwrap(), Some(3));
        assert_eq!(engine.get("d").unwrap(), Some(4));
    }

    #[test]
    fn test_random_respects_capacity() {
        let engine = InMemoryEngine::new(5).with_policy(EvictionPolicy::Random);
        for i in 0..50 {
            engine.set(&format!("k{}", i), i, None).unwrap();
        }
        assert_eq!(engine.len(), 5);
        assert_eq!(engine.order.lock().len(), 5);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let engine = InMemoryEngine::new(0);
        engine.set("k", 1, None).unwrap();
        assert!(engine.is_empty());
        assert_eq!(engine.get("k").unwrap(), None);
    }

    #[test]
    fn test_ttl_expires_entries() {
        let engine = InMemoryEngine::new(10).with_ttl(Duration::from_millis(50));
        engine.set("k", 1, None).unwrap();
        assert_eq!(engine.get("k").unwrap(), Some(1));

        thread::sleep(Duration::from_millis(80));
        assert_eq!(engine.get("k").unwrap(), None);
        assert!(engine.is_empty());
    }

    #[test]
    fn test_rejects_foreign_expiry() {
        let engine = InMemoryEngine::new(10);
        let err = engine
            .set("k", 1, Some(Duration::from_secs(10)))
            .unwrap_err();

        match err {
            CacheError::UnsupportedExpiry {
                requested,
                configured,
            } => {
                assert_eq!(requested, Duration::from_secs(10));
                assert_eq!(configured, None);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(engine.is_empty());
    }

    #[test]
    fn test_accepts_own_ttl() {
        let engine = InMemoryEngine::new(10).with_ttl(Duration::from_secs(30));
        engine.set("k", 1, Some(Duration::from_secs(30))).unwrap();
        engine.set("j", 2, None).unwrap();
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn test_remove_and_clear() {
        let engine = InMemoryEngine::new(10);
        engine.set("a", 1, None).unwrap();
        engine.set("b", 2, None).unwrap();

        assert!(engine.remove("a"));
        assert!(!engine.remove("a"));
        assert_eq!(engine.len(), 1);

        engine.clear();
        assert!(engine.is_empty());
        assert!(engine.order.lock().is_empty());
    }

    #[test]
    fn test_concurrent_sets_stay_bounded() {
        use std::sync::Arc;

        let engine = Arc::new(InMemoryEngine::new(16));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for i in 0..100 {
                        let key = format!("{}-{}", t, i);
                        engine.set(&key, i, None).unwrap();
                        engine.get(&key).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(engine.len(), 16);
    }
}
