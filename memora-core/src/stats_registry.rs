//! Global registry of per-function cache statistics.
//!
//! The `#[memoize]` attribute registers each function's [`CacheStats`] under
//! the function name (or its `name = "..."` override), so statistics can be
//! queried without holding the decorator itself.
//!
//! ```
//! use memora_core::stats_registry;
//!
//! if let Some(stats) = stats_registry::get("my_function") {
//!     println!("Hits: {}", stats.hits());
//!     println!("Misses: {}", stats.misses());
//! }
//!
//! for name in stats_registry::list() {
//!     println!("Function: {}", name);
//! }
//! ```

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{CacheStats, StatsSnapshot};

static STATS_REGISTRY: Lazy<RwLock<HashMap<String, Arc<CacheStats>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers `stats` under `name`, replacing any previous registration.
pub fn register(name: &str, stats: Arc<CacheStats>) {
    STATS_REGISTRY.write().insert(name.to_string(), stats);
}

/// Returns a snapshot of the statistics registered under `name`.
pub fn get(name: &str) -> Option<StatsSnapshot> {
    STATS_REGISTRY.read().get(name).map(|stats| stats.snapshot())
}

/// Snapshots of every registration, sorted by name.
pub fn snapshot_all() -> Vec<(String, StatsSnapshot)> {
    let mut all: Vec<_> = STATS_REGISTRY
        .read()
        .iter()
        .map(|(name, stats)| (name.clone(), stats.snapshot()))
        .collect();
    all.sort_by(|a, b| a.0.cmp(&b.0));
    all
}

/// Returns the live counters registered under `name`.
pub fn get_shared(name: &str) -> Option<Arc<CacheStats>> {
    STATS_REGISTRY.read().get(name).cloned()
}

/// Lists every registered name.
pub fn list() -> Vec<String> {
    STATS_REGISTRY.read().keys().cloned().collect()
}

/// Resets the counters registered under `name`.
///
/// Returns `false` if nothing is registered under that name.
pub fn reset(name: &str) -> bool {
    match STATS_REGISTRY.read().get(name) {
        Some(stats) => {
            stats.reset();
            true
        }
        None => false,
    }
}

/// Removes every registration. The counters themselves are left untouched.
pub fn clear() {
    STATS_REGISTRY.write().clear();
}
