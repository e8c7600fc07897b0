//! # Memora
//!
//! Memoization with pluggable cache engines.
//!
//! A memoized function derives a cache key from its name and arguments, asks a
//! [`CacheEngine`] for it and only runs when the engine has nothing stored.
//! Engines are interchangeable: bounded in-memory LRU, an expiring concurrent
//! map, a persistent on-disk store, or your own client for a networked cache.
//!
//! ## Features
//!
//! - **Attribute macro**: add `#[memoize(engine = ...)]` to a function
//! - **Pluggable backends**: implement two methods of [`CacheEngine`], or
//!   enable the `redis` / `memcache` features for the bundled networked engines
//! - **Presence-based hits**: a cached `0`, `false` or empty value is still a hit
//! - **Result-aware**: only `Ok` values are cached
//! - **Statistics**: hit, miss and engine failure counters per function (`stats` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use memora::{memoize, InMemoryEngine};
//!
//! #[memoize(engine = InMemoryEngine::new(1000))]
//! fn fibonacci(n: u64) -> u64 {
//!     if n <= 1 {
//!         return n;
//!     }
//!     fibonacci(n - 1) + fibonacci(n - 2)
//! }
//!
//! // First call computes the result
//! let result1 = fibonacci(50);
//! // Second call returns the cached result
//! let result2 = fibonacci(50);
//! assert_eq!(result1, result2);
//! ```
//!
//! ## Expiry
//!
//! The expiry is handed to the engine on every store. Engines with their own
//! ttl, like [`InMemoryEngine`], only accept that ttl; [`VolatileEngine`] and
//! [`DiskEngine`] honor any expiry:
//!
//! ```rust
//! use memora::{memoize, VolatileEngine};
//!
//! #[memoize(engine = VolatileEngine::new(), expiry = 60)]
//! fn exchange_rate(from: &str, to: &str) -> f64 {
//!     if from == to { 1.0 } else { 0.92 }
//! }
//!
//! assert_eq!(exchange_rate("USD", "USD"), 1.0);
//! ```
//!
//! ## Custom Cache Keys
//!
//! Arguments are turned into key components through [`CacheableKey`].
//! Opt into the `Debug`-based implementation or write your own:
//!
//! ```rust
//! use memora::{memoize, CacheableKey, DefaultCacheableKey, InMemoryEngine};
//!
//! #[derive(Debug, Clone)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl DefaultCacheableKey for Point {}
//!
//! struct UserId(u64);
//!
//! impl CacheableKey for UserId {
//!     fn to_cache_key(&self) -> String {
//!         format!("user:{}", self.0)
//!     }
//! }
//!
//! #[memoize(engine = InMemoryEngine::new(100))]
//! fn distance(p: Point) -> i32 {
//!     p.x.abs() + p.y.abs()
//! }
//!
//! #[memoize(engine = InMemoryEngine::new(100))]
//! fn user_name(id: UserId) -> String {
//!     format!("user #{}", id.0)
//! }
//!
//! assert_eq!(distance(Point { x: 3, y: -4 }), 7);
//! assert_eq!(user_name(UserId(7)), "user #7");
//! ```
//!
//! ## Error Handling
//!
//! Functions returning `Result<T, E>` only cache successful results:
//!
//! ```rust
//! use memora::{memoize, InMemoryEngine};
//!
//! #[memoize(engine = InMemoryEngine::new(100))]
//! fn divide(a: i32, b: i32) -> Result<i32, String> {
//!     if b == 0 {
//!         Err("Division by zero".to_string())
//!     } else {
//!         Ok(a / b)
//!     }
//! }
//!
//! // Ok results are cached
//! assert_eq!(divide(10, 2), Ok(5));
//! // Err results are NOT cached
//! assert!(divide(10, 0).is_err());
//! ```
//!
//! ## Without the macro
//!
//! [`Memoize`] is the decorator behind the attribute. Using it directly gives
//! access to engine errors and to engines shared between functions:
//!
//! ```rust
//! use memora::{Args, CacheEngine, Memoize, VolatileEngine};
//! use std::sync::Arc;
//!
//! let engine: Arc<dyn CacheEngine<String>> = Arc::new(VolatileEngine::new());
//! let memo = Memoize::from_shared(Arc::clone(&engine));
//!
//! let value = memo
//!     .get_or_compute("shout", &Args::new().arg("hi"), || "HI".to_string())
//!     .unwrap();
//! assert_eq!(value, "HI");
//! ```

pub use memora_core::*;
pub use memora_macros::memoize;
