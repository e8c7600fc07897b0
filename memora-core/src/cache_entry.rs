use std::time::{Duration, Instant};

use crate::Expiry;

/// Value stored by the in-process engines, stamped with its insertion time and ttl.
///
/// # Type Parameters
///
/// * `V` - The type of the cached value
///
/// # Fields
///
/// * `value` - The cached value
/// * `inserted_at` - The `Instant` when this entry was created
/// * `ttl` - How long the entry stays valid; `None` never expires
///
/// # Examples
///
/// ```
/// use memora_core::CacheEntry;
/// use std::time::Duration;
///
/// let entry = CacheEntry::new(42, Some(Duration::from_secs(60)));
/// assert_eq!(entry.value, 42);
/// assert!(!entry.is_expired());
/// ```
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted_at: Instant,
    pub ttl: Expiry,
}

impl<V> CacheEntry<V> {
    /// Creates a new entry stamped with `Instant::now()`.
    pub fn new(value: V, ttl: Expiry) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
            ttl,
        }
    }

    /// Returns true once the entry is at least `ttl` old.
    ///
    /// # Examples
    ///
    /// ```
    /// use memora_core::CacheEntry;
    /// use std::thread;
    /// use std::time::Duration;
    ///
    /// let entry = CacheEntry::new("data", Some(Duration::from_millis(50)));
    /// assert!(!entry.is_expired());
    ///
    /// thread::sleep(Duration::from_millis(80));
    /// assert!(entry.is_expired());
    ///
    /// // No ttl means never expires
    /// assert!(!CacheEntry::new("data", None).is_expired());
    /// ```
    pub fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.inserted_at.elapsed() >= ttl,
            None => false,
        }
    }

    /// Time left before expiry, `None` for entries without a ttl.
    pub fn remaining(&self) -> Option<Duration> {
        self.ttl
            .map(|ttl| ttl.saturating_sub(self.inserted_at.elapsed()))
    }
}
