/// Integration tests for per-function statistics of memoized functions

#[cfg(feature = "stats")]
#[cfg(test)]
mod tests {
    use memora::{memoize, stats_registry, InMemoryEngine};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use serial_test::serial;

    // Defined outside the tests so every test shares the same statics
    #[memoize(engine = InMemoryEngine::new(100), name = "custom_stats_cache")]
    fn with_custom_name(x: i32) -> i32 {
        x * 2
    }

    #[memoize(engine = InMemoryEngine::new(100))]
    fn default_stats_name(x: i32) -> i32 {
        x * 3
    }

    static UNSTORED_CALLS: AtomicUsize = AtomicUsize::new(0);

    // The engine owns its ttl and refuses the per-call expiry on every store
    #[memoize(engine = InMemoryEngine::new(100), expiry = 10)]
    fn unstored(x: i32) -> i32 {
        UNSTORED_CALLS.fetch_add(1, Ordering::SeqCst);
        x + 1
    }

    #[test]
    #[serial]
    fn test_names_are_registered() {
        with_custom_name(1);
        default_stats_name(1);

        let registered = stats_registry::list();
        assert!(
            registered.contains(&"custom_stats_cache".to_string()),
            "custom name should be registered"
        );
        assert!(
            registered.contains(&"default_stats_name".to_string()),
            "function name should be registered"
        );
        assert!(!registered.contains(&"with_custom_name".to_string()));
    }

    #[test]
    #[serial]
    fn test_hits_and_misses() {
        // Force registration before resetting
        with_custom_name(900_000);
        stats_registry::reset("custom_stats_cache");

        with_custom_name(900_001); // Miss
        with_custom_name(900_001); // Hit
        with_custom_name(900_002); // Miss
        with_custom_name(900_001); // Hit

        let stats = stats_registry::get("custom_stats_cache").expect("stats registered");
        assert_eq!(stats.hits(), 2);
        assert_eq!(stats.misses(), 2);
        assert_eq!(stats.total_accesses(), 4);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    #[serial]
    fn test_reset_unknown_name() {
        assert!(!stats_registry::reset("never_registered_function"));
        assert!(stats_registry::get("never_registered_function").is_none());
    }

    #[test]
    #[serial]
    fn test_rejected_stores_are_counted() {
        unstored(0);
        stats_registry::reset("unstored");

        assert_eq!(unstored(1), 2);
        assert_eq!(unstored(1), 2);
        assert_eq!(unstored(1), 2);

        let stats = stats_registry::get("unstored").expect("stats registered");
        assert_eq!(stats.misses(), 3);
        assert_eq!(stats.hits(), 0);
        assert_eq!(stats.store_failures(), 3);
        assert_eq!(stats.lookup_failures(), 0);
        assert_eq!(UNSTORED_CALLS.load(Ordering::SeqCst), 4);
    }
}
