//! Bundled [`CacheEngine`](crate::CacheEngine) implementations.
//!
//! | Engine | Bound | Expiry |
//! |--------|-------|--------|
//! | [`InMemoryEngine`] | capacity, FIFO/LRU/Random eviction | one ttl for the whole engine |
//! | [`VolatileEngine`] | unbounded | per `set` |
//! | [`DiskEngine`] | unbounded, persistent | per `set` |
//! | `RedisEngine` (`redis` feature) | server memory policy | per `set`, `EX`/`PX` |
//! | `MemcachedEngine` (`memcache` feature) | server memory (LRU) | per `set`, whole seconds |

mod disk;
#[cfg(feature = "memcache")]
mod memcached;
mod memory;
#[cfg(feature = "redis")]
mod redis;
mod volatile;

pub use disk::DiskEngine;
#[cfg(feature = "memcache")]
pub use memcached::MemcachedEngine;
pub use memory::InMemoryEngine;
#[cfg(feature = "redis")]
pub use self::redis::RedisEngine;
pub use volatile::{VolatileEngine, DEFAULT_SWEEP_INTERVAL};
