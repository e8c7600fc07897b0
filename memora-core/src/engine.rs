use std::sync::Arc;
use std::time::Duration;

use crate::Result;

/// Time-to-live hint handed to [`CacheEngine::set`].
///
/// `None` means "no expiry" and is forwarded to the engine unchanged. How the
/// hint is interpreted (enforced, advisory or rejected) is up to the engine.
pub type Expiry = Option<Duration>;

/// Expiry used by [`Memoize`](crate::Memoize) when none is configured.
///
/// Engines that own their ttl accept `None`, so the default works with every
/// bundled engine.
pub const DEFAULT_EXPIRY: Expiry = None;

/// Capability contract every cache backend satisfies.
///
/// The memoize decorator only talks to backends through these two operations,
/// so in-process stores, on-disk stores and networked clients are
/// interchangeable.
///
/// # Contract
///
/// * `get` returns `Ok(None)` for a missing or expired key. It never reports a
///   miss as an error.
/// * A value stored with `set` is returned by `get` for the same key until it
///   expires or is evicted according to the engine's own policy.
/// * An engine that manages a global expiry policy may reject a non-default
///   per-call expiry with [`CacheError::UnsupportedExpiry`](crate::CacheError::UnsupportedExpiry).
///
/// Engines take `&self` and must be `Send + Sync`: one engine can back several
/// decorators at once through an `Arc`.
///
/// # Examples
///
/// A backend wrapping some external client:
///
/// ```
/// use memora_core::{CacheEngine, CacheError, Expiry, Result};
/// use parking_lot::Mutex;
/// use std::collections::HashMap;
///
/// struct Remote {
///     data: Mutex<HashMap<String, Vec<u8>>>,
/// }
///
/// impl CacheEngine<Vec<u8>> for Remote {
///     fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
///         Ok(self.data.lock().get(key).cloned())
///     }
///
///     fn set(&self, key: &str, value: Vec<u8>, _expiry: Expiry) -> Result<()> {
///         self.data.lock().insert(key.to_string(), value);
///         Ok(())
///     }
/// }
///
/// let remote = Remote { data: Mutex::new(HashMap::new()) };
/// remote.set("k", vec![1, 2], None).unwrap();
/// assert_eq!(remote.get("k").unwrap(), Some(vec![1, 2]));
/// assert_eq!(remote.get("missing").unwrap(), None);
/// ```
pub trait CacheEngine<V>: Send + Sync {
    /// Looks up `key`, returning `Ok(None)` on a miss.
    fn get(&self, key: &str) -> Result<Option<V>>;

    /// Stores `value` under `key`, overwriting any previous entry.
    fn set(&self, key: &str, value: V, expiry: Expiry) -> Result<()>;
}

impl<V, E> CacheEngine<V> for Arc<E>
where
    E: CacheEngine<V> + ?Sized,
{
    fn get(&self, key: &str) -> Result<Option<V>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: V, expiry: Expiry) -> Result<()> {
        (**self).set(key, value, expiry)
    }
}

impl<V, E> CacheEngine<V> for Box<E>
where
    E: CacheEngine<V> + ?Sized,
{
    fn get(&self, key: &str) -> Result<Option<V>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: V, expiry: Expiry) -> Result<()> {
        (**self).set(key, value, expiry)
    }
}
