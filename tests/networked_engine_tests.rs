//! Integration tests against live Redis and memcached servers.
//!
//! Ignored by default. Start the servers and run:
//! `MEMORA_REDIS_URL=redis://127.0.0.1:6379/15 cargo test --features redis,memcache -- --ignored`
#![cfg(any(feature = "redis", feature = "memcache"))]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Key prefix unique to one test run, so reruns never start warm.
fn run_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("run{}", nanos)
}

#[cfg(feature = "redis")]
mod redis_engine {
    use super::*;
    use memora::{Args, CacheEngine, Memoize, RedisEngine};

    fn engine<V>() -> RedisEngine<V> {
        let url = std::env::var("MEMORA_REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string());
        RedisEngine::open(&url).unwrap()
    }

    #[test]
    #[ignore = "needs a redis server"]
    fn test_miss_then_hit() {
        let engine = engine::<String>();
        let key = format!("{}:greeting", run_id());

        assert_eq!(engine.get(&key).unwrap(), None);
        engine.set(&key, "hello".to_string(), None).unwrap();
        assert_eq!(engine.get(&key).unwrap(), Some("hello".to_string()));
    }

    #[test]
    #[ignore = "needs a redis server"]
    fn test_expiry_is_enforced_by_the_server() {
        let engine = engine::<u32>();
        let key = format!("{}:short", run_id());

        engine
            .set(&key, 1, Some(Duration::from_millis(200)))
            .unwrap();
        assert_eq!(engine.get(&key).unwrap(), Some(1));

        std::thread::sleep(Duration::from_millis(400));
        assert_eq!(engine.get(&key).unwrap(), None);
    }

    #[test]
    #[ignore = "needs a redis server"]
    fn test_memoize_over_redis() {
        let memo: Memoize<Vec<u32>> =
            Memoize::new(engine()).with_expiry(Some(Duration::from_secs(30)));
        let name = format!("{}:range", run_id());
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = memo
                .get_or_compute(&name, &Args::new().arg(&4u32), || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    (0..4).collect()
                })
                .unwrap();
            assert_eq!(value, vec![0, 1, 2, 3]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

#[cfg(feature = "memcache")]
mod memcached_engine {
    use super::*;
    use memora::{Args, CacheEngine, MemcachedEngine, Memoize};

    fn engine<V>() -> MemcachedEngine<V> {
        let url = std::env::var("MEMORA_MEMCACHED_URL")
            .unwrap_or_else(|_| "memcache://127.0.0.1:11211".to_string());
        MemcachedEngine::connect(&url).unwrap()
    }

    #[test]
    #[ignore = "needs a memcached server"]
    fn test_miss_then_hit() {
        let engine = engine::<String>();
        let key = format!("{}:greeting", run_id());

        assert_eq!(engine.get(&key).unwrap(), None);
        engine.set(&key, "hello".to_string(), None).unwrap();
        assert_eq!(engine.get(&key).unwrap(), Some("hello".to_string()));
    }

    #[test]
    #[ignore = "needs a memcached server"]
    fn test_expiry_is_enforced_by_the_server() {
        let engine = engine::<u32>();
        let key = format!("{}:short", run_id());

        engine.set(&key, 1, Some(Duration::from_secs(1))).unwrap();
        assert_eq!(engine.get(&key).unwrap(), Some(1));

        std::thread::sleep(Duration::from_millis(2100));
        assert_eq!(engine.get(&key).unwrap(), None);
    }

    #[test]
    #[ignore = "needs a memcached server"]
    fn test_long_keys_round_trip() {
        let memo: Memoize<String> = Memoize::new(engine());
        let name = format!("{}:long", run_id());
        let long_arg = "x".repeat(400);

        let first = memo
            .get_or_compute(&name, &Args::new().arg(long_arg.as_str()), || "v".to_string())
            .unwrap();
        let again = memo
            .get_or_compute(&name, &Args::new().arg(long_arg.as_str()), || unreachable!())
            .unwrap();
        assert_eq!(first, again);
    }
}
