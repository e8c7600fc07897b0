//! Order-queue helpers shared by the bounded in-memory engine.

use crate::CacheEntry;
use std::collections::{HashMap, VecDeque};

/// Moves a key to the end of the order queue (marks it as most recently used).
///
/// If the key is not in the queue the queue is left unchanged.
///
/// # Examples
///
/// ```
/// use std::collections::VecDeque;
/// use memora_core::utils::move_key_to_end;
///
/// let mut order = VecDeque::from(vec!["key1".to_string(), "key2".to_string(), "key3".to_string()]);
///
/// move_key_to_end(&mut order, "key2");
/// assert_eq!(order.back().unwrap(), "key2");
///
/// move_key_to_end(&mut order, "missing");
/// assert_eq!(order.len(), 3);
/// ```
pub fn move_key_to_end(order: &mut VecDeque<String>, key: &str) {
    if let Some(pos) = order.iter().position(|k| k == key) {
        if let Some(k) = order.remove(pos) {
            order.push_back(k);
        }
    }
}

/// Removes a key from both the entry map and the order queue.
///
/// Returns `true` if the key was present in either structure.
///
/// # Examples
///
/// ```
/// use std::collections::{HashMap, VecDeque};
/// use memora_core::{CacheEntry, utils::remove_key};
///
/// let mut map = HashMap::new();
/// let mut order = VecDeque::new();
/// map.insert("key1".to_string(), CacheEntry::new(42, None));
/// order.push_back("key1".to_string());
///
/// assert!(remove_key(&mut map, &mut order, "key1"));
/// assert!(map.is_empty());
/// assert!(order.is_empty());
/// assert!(!remove_key(&mut map, &mut order, "key1"));
/// ```
pub fn remove_key<V>(
    map: &mut HashMap<String, CacheEntry<V>>,
    order: &mut VecDeque<String>,
    key: &str,
) -> bool {
    let removed_from_map = map.remove(key).is_some();
    let removed_from_order = match order.iter().position(|k| k == key) {
        Some(pos) => order.remove(pos).is_some(),
        None => false,
    };

    removed_from_map || removed_from_order
}

/// Pops keys from the front of the queue until one that is still in the map is evicted.
///
/// Keys left in the queue by earlier removals (orphans) are skipped. Returns the
/// evicted key, or `None` if the queue ran empty.
pub fn evict_front<V>(
    map: &mut HashMap<String, CacheEntry<V>>,
    order: &mut VecDeque<String>,
) -> Option<String> {
    while let Some(key) = order.pop_front() {
        if map.remove(&key).is_some() {
            return Some(key);
        }
    }
    None
}
