/// Integration tests for the #[memoize] attribute
use memora::{memoize, InMemoryEngine, VolatileEngine};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

static IDENTITY_CALLS: AtomicUsize = AtomicUsize::new(0);

#[memoize(engine = InMemoryEngine::new(10))]
fn identity(a: i32, b: i32, c: i32, d: i32, e: i32) -> (i32, i32, i32, i32, i32) {
    IDENTITY_CALLS.fetch_add(1, Ordering::SeqCst);
    (a, b, c, d, e)
}

#[test]
fn test_identity_computes_once() {
    for _ in 0..4 {
        assert_eq!(identity(1, 2, 3, 4, 5), (1, 2, 3, 4, 5));
    }
    assert_eq!(IDENTITY_CALLS.load(Ordering::SeqCst), 1);
}

static ZERO_CALLS: AtomicUsize = AtomicUsize::new(0);

#[memoize(engine = InMemoryEngine::new(10))]
fn always_zero(_seed: u8) -> u64 {
    ZERO_CALLS.fetch_add(1, Ordering::SeqCst);
    0
}

#[test]
fn test_zero_is_cached() {
    assert_eq!(always_zero(1), 0);
    assert_eq!(always_zero(1), 0);
    assert_eq!(always_zero(1), 0);
    assert_eq!(ZERO_CALLS.load(Ordering::SeqCst), 1);
}

static DIVIDE_CALLS: AtomicUsize = AtomicUsize::new(0);

#[memoize(engine = InMemoryEngine::new(10))]
fn divide(a: i32, b: i32) -> Result<i32, String> {
    DIVIDE_CALLS.fetch_add(1, Ordering::SeqCst);
    if b == 0 {
        return Err("division by zero".to_string());
    }
    Ok(a / b)
}

#[test]
fn test_errors_are_not_cached() {
    assert_eq!(divide(9, 3), Ok(3));
    assert_eq!(divide(9, 3), Ok(3));
    assert_eq!(DIVIDE_CALLS.load(Ordering::SeqCst), 1);

    assert!(divide(1, 0).is_err());
    assert!(divide(1, 0).is_err());
    assert_eq!(DIVIDE_CALLS.load(Ordering::SeqCst), 3);
}

static GREET_CALLS: AtomicUsize = AtomicUsize::new(0);

#[memoize(engine = VolatileEngine::new(), expiry = 60)]
fn greet(name: &str, excited: bool) -> String {
    GREET_CALLS.fetch_add(1, Ordering::SeqCst);
    let mark = if excited { "!" } else { "." };
    format!("Hello, {}{}", name, mark)
}

#[test]
fn test_arguments_select_entries() {
    assert_eq!(greet("Ada", true), "Hello, Ada!");
    assert_eq!(greet("Ada", false), "Hello, Ada.");
    assert_eq!(greet("Ada", true), "Hello, Ada!");
    assert_eq!(greet("Grace Hopper", true), "Hello, Grace Hopper!");
    assert_eq!(GREET_CALLS.load(Ordering::SeqCst), 3);
}

static SHORT_CALLS: AtomicUsize = AtomicUsize::new(0);

#[memoize(engine = VolatileEngine::new(), expiry = 0.05)]
fn short_lived(n: u32) -> u32 {
    SHORT_CALLS.fetch_add(1, Ordering::SeqCst);
    n + 1
}

#[test]
fn test_expiry_is_honored_by_engine() {
    assert_eq!(short_lived(1), 2);
    assert_eq!(short_lived(1), 2);
    assert_eq!(SHORT_CALLS.load(Ordering::SeqCst), 1);

    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(short_lived(1), 2);
    assert_eq!(SHORT_CALLS.load(Ordering::SeqCst), 2);
}

static REJECTED_CALLS: AtomicUsize = AtomicUsize::new(0);

// The in-memory engine owns its ttl: the per-call expiry is rejected on every
// store, so the function keeps working but nothing is cached.
#[memoize(engine = InMemoryEngine::new(10), expiry = 10)]
fn never_cached(n: u32) -> u32 {
    REJECTED_CALLS.fetch_add(1, Ordering::SeqCst);
    n * 2
}

#[test]
fn test_engine_errors_fall_back_to_computing() {
    assert_eq!(never_cached(4), 8);
    assert_eq!(never_cached(4), 8);
    assert_eq!(REJECTED_CALLS.load(Ordering::SeqCst), 2);
}

#[memoize(engine = InMemoryEngine::new(1000))]
fn fibonacci(n: u64) -> u64 {
    if n <= 1 {
        return n;
    }
    fibonacci(n - 1) + fibonacci(n - 2)
}

#[test]
fn test_recursive_function() {
    assert_eq!(fibonacci(90), 2880067194370816120);
}

/// Doubles a number.
#[memoize(engine = InMemoryEngine::new(10))]
#[inline]
pub fn documented_double(n: i64) -> i64 {
    n * 2
}

#[test]
fn test_signature_is_preserved() {
    let f: fn(i64) -> i64 = documented_double;
    assert_eq!(f(21), 42);
}

static KEY_FN_CALLS: AtomicUsize = AtomicUsize::new(0);

fn first_arg_only(name: &str, args: &memora::Args) -> String {
    format!("{}:{}", name, args.positional()[0])
}

#[memoize(engine = InMemoryEngine::new(10), key_fn = first_arg_only)]
fn ignores_second(a: u8, _b: u8) -> u8 {
    KEY_FN_CALLS.fetch_add(1, Ordering::SeqCst);
    a
}

#[test]
fn test_custom_key_fn() {
    assert_eq!(ignores_second(1, 1), 1);
    assert_eq!(ignores_second(1, 2), 1);
    assert_eq!(KEY_FN_CALLS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_single_flight_under_contention() {
    static SLOW_CALLS: AtomicUsize = AtomicUsize::new(0);

    #[memoize(engine = InMemoryEngine::new(10), single_flight = true)]
    fn slow_square(n: u64) -> u64 {
        SLOW_CALLS.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        n * n
    }

    let handles: Vec<_> = (0..8)
        .map(|_| std::thread::spawn(|| slow_square(12)))
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 144);
    }
    assert_eq!(SLOW_CALLS.load(Ordering::SeqCst), 1);
}
