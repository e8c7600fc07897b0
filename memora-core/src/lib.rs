//! # memora-core
//!
//! Core building blocks of the `memora` memoization library:
//!
//! - [`CacheEngine`]: the two-operation contract (`get`/`set`) every backend
//!   satisfies
//! - [`InMemoryEngine`], [`VolatileEngine`] and [`DiskEngine`]: bundled backends,
//!   plus `RedisEngine` and `MemcachedEngine` behind the `redis` and
//!   `memcache` features
//! - [`Args`], [`CacheableKey`], [`KeyFn`] and [`default_key`]: key derivation
//! - [`Memoize`]: the decorator sequencing key derivation, lookup, computation
//!   and storage
//! - [`EngineConfig`]: engine selection from JSON or environment variables
//! - [`CacheStats`] and [`stats_registry`]: hit, miss and engine failure counters (`stats` feature)
//!
//! Most users depend on the `memora` crate, which re-exports this one together
//! with the `#[memoize]` attribute.
//!
//! ```
//! use memora_core::{Args, Memoize, VolatileEngine};
//! use std::time::Duration;
//!
//! let memo = Memoize::new(VolatileEngine::new()).with_expiry(Some(Duration::from_secs(60)));
//!
//! let greeting = memo
//!     .get_or_compute("greet", &Args::new().arg("Ada"), || "Hello, Ada".to_string())
//!     .unwrap();
//! assert_eq!(greeting, "Hello, Ada");
//! ```

mod cache_entry;
mod config;
mod engine;
mod engines;
mod error;
mod eviction_policy;
mod keys;
mod memoize;
mod single_flight;

#[cfg(feature = "stats")]
mod stats;
#[cfg(feature = "stats")]
pub mod stats_registry;

pub mod utils;

pub use cache_entry::CacheEntry;
pub use config::{
    EngineConfig, DEFAULT_CAPACITY, DEFAULT_DISK_PATH, DEFAULT_POLICY, ENV_CAPACITY,
    ENV_DISK_PATH, ENV_ENGINE, ENV_POLICY, ENV_TTL_SECS,
};
pub use engine::{CacheEngine, Expiry, DEFAULT_EXPIRY};
pub use engines::{DiskEngine, InMemoryEngine, VolatileEngine, DEFAULT_SWEEP_INTERVAL};
#[cfg(feature = "memcache")]
pub use engines::MemcachedEngine;
#[cfg(feature = "redis")]
pub use engines::RedisEngine;
pub use error::{CacheError, Result};
pub use eviction_policy::EvictionPolicy;
pub use keys::{
    default_key, hashed_key, Args, CacheableKey, DefaultCacheableKey, IntoArgs, KeyFn,
    GROUP_SEPARATOR, ITEM_SEPARATOR,
};
pub use memoize::{Memoize, Memoized};
pub use single_flight::{FlightGuard, SingleFlight};
#[cfg(feature = "stats")]
pub use stats::{CacheEvent, CacheStats, StatsSnapshot};

/// Re-exports used by code generated by `#[memoize]`. Not public API.
#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;

    /// Publishes the statistics of a generated function, when stats are compiled in.
    pub fn register_stats<V: Clone + 'static>(memo: &crate::Memoize<V>, name: &str) {
        #[cfg(feature = "stats")]
        memo.register_stats(name);
        #[cfg(not(feature = "stats"))]
        let _ = (memo, name);
    }
}
