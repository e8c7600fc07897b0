use std::convert::Infallible;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::keys::{default_key, Args, IntoArgs, KeyFn};
use crate::single_flight::SingleFlight;
use crate::{CacheEngine, CacheError, Expiry, Result, DEFAULT_EXPIRY};

#[cfg(feature = "stats")]
use crate::{CacheEvent, CacheStats};

/// Memoize decorator: an engine, a key function and an expiry.
///
/// Every call derives a key from the function name and its arguments and asks
/// the engine for it. A stored value is returned without running the function
/// (hit). Otherwise the function runs, its result is stored with the
/// configured expiry and returned (miss).
///
/// Hits are decided by presence, not by value: a cached `0`, `false`, `""`
/// or empty collection is returned like any other value.
///
/// The configuration is immutable once built and cheap to clone; clones share
/// the engine, the key function and the statistics.
///
/// # Examples
///
/// ```
/// use memora_core::{Args, InMemoryEngine, Memoize};
///
/// let memo = Memoize::new(InMemoryEngine::new(100));
///
/// let square = |n: u64| n * n;
/// let first = memo.get_or_compute("square", &Args::new().arg(&12), || square(12)).unwrap();
/// let again = memo.get_or_compute("square", &Args::new().arg(&12), || unreachable!()).unwrap();
/// assert_eq!(first, 144);
/// assert_eq!(again, 144);
/// ```
///
/// Wrapping a function keeps its name attached:
///
/// ```
/// use memora_core::{InMemoryEngine, Memoize};
///
/// let memo = Memoize::new(InMemoryEngine::new(10));
/// let add = memo.wrap("add", |(a, b): (i32, i32)| a + b);
///
/// assert_eq!(add.name(), "add");
/// assert_eq!(add.call((2, 3)).unwrap(), 5);
/// ```
pub struct Memoize<V> {
    engine: Arc<dyn CacheEngine<V>>,
    key_fn: Arc<dyn KeyFn>,
    expiry: Expiry,
    flights: Option<Arc<SingleFlight>>,
    #[cfg(feature = "stats")]
    stats: Arc<CacheStats>,
}

impl<V> Clone for Memoize<V> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            key_fn: Arc::clone(&self.key_fn),
            expiry: self.expiry,
            flights: self.flights.clone(),
            #[cfg(feature = "stats")]
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<V: Clone + 'static> Memoize<V> {
    /// Creates a decorator over `engine` with [`default_key`] and [`DEFAULT_EXPIRY`].
    pub fn new<E>(engine: E) -> Self
    where
        E: CacheEngine<V> + 'static,
    {
        Self::from_shared(Arc::new(engine))
    }

    /// Creates a decorator over an engine that is shared with other decorators.
    pub fn from_shared(engine: Arc<dyn CacheEngine<V>>) -> Self {
        Self {
            engine,
            key_fn: Arc::new(default_key),
            expiry: DEFAULT_EXPIRY,
            flights: None,
            #[cfg(feature = "stats")]
            stats: Arc::new(CacheStats::new()),
        }
    }

    /// Replaces the key function.
    pub fn with_key_fn<K>(mut self, key_fn: K) -> Self
    where
        K: KeyFn + 'static,
    {
        self.key_fn = Arc::new(key_fn);
        self
    }

    /// Sets the expiry passed to every `set`; `None` means no expiry.
    pub fn with_expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    /// Allows at most one computation per key at a time.
    ///
    /// Off by default: without it, concurrent misses on the same key all run
    /// the function and the last `set` wins.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.flights = enabled.then(|| Arc::new(SingleFlight::new()));
        self
    }

    pub fn engine(&self) -> &Arc<dyn CacheEngine<V>> {
        &self.engine
    }

    pub fn expiry(&self) -> Expiry {
        self.expiry
    }

    pub fn is_single_flight(&self) -> bool {
        self.flights.is_some()
    }

    /// The key a call to `name` with `args` is stored under.
    pub fn key_for(&self, name: &str, args: &Args) -> String {
        self.key_fn.derive_key(name, args)
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Publishes this decorator's statistics in the [`stats_registry`](crate::stats_registry).
    #[cfg(feature = "stats")]
    pub fn register_stats(&self, name: &str) {
        crate::stats_registry::register(name, Arc::clone(&self.stats));
    }

    /// Returns the cached result for `name(args)`, computing and storing it on a miss.
    ///
    /// Engine errors are returned as-is; nothing is retried.
    pub fn get_or_compute<F>(&self, name: &str, args: &Args, compute: F) -> Result<V>
    where
        F: FnOnce() -> V,
    {
        self.call(name, args, || Ok(compute()), |err| Err(err))
    }

    /// Like [`get_or_compute`](Self::get_or_compute) for fallible functions.
    ///
    /// Only `Ok` values are stored; an `Err` is returned without touching the
    /// engine, so the next call runs the function again.
    ///
    /// ```
    /// use memora_core::{Args, CacheError, InMemoryEngine, Memoize};
    ///
    /// #[derive(Debug)]
    /// enum AppError {
    ///     Cache(CacheError),
    ///     DivideByZero,
    /// }
    ///
    /// impl From<CacheError> for AppError {
    ///     fn from(err: CacheError) -> Self {
    ///         AppError::Cache(err)
    ///     }
    /// }
    ///
    /// let memo: Memoize<i32> = Memoize::new(InMemoryEngine::new(10));
    /// let divide = |a: i32, b: i32| -> Result<i32, AppError> {
    ///     memo.get_or_try_compute("divide", &Args::new().arg(&a).arg(&b), || {
    ///         if b == 0 { Err(AppError::DivideByZero) } else { Ok(a / b) }
    ///     })
    /// };
    ///
    /// assert_eq!(divide(10, 2).unwrap(), 5);
    /// assert!(matches!(divide(1, 0), Err(AppError::DivideByZero)));
    /// ```
    pub fn get_or_try_compute<E, F>(
        &self,
        name: &str,
        args: &Args,
        compute: F,
    ) -> std::result::Result<V, E>
    where
        E: From<CacheError>,
        F: FnOnce() -> std::result::Result<V, E>,
    {
        self.call(name, args, compute, |err| Err(E::from(err)))
    }

    /// Like [`get_or_compute`](Self::get_or_compute), but engine failures never reach the caller.
    ///
    /// A failed `get` is logged and treated as a miss; a failed `set` is
    /// logged and the computed value is still returned. Used by the
    /// `#[memoize]` attribute, which must keep the function's signature.
    pub fn get_or_compute_best_effort<F>(&self, name: &str, args: &Args, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        match self.call::<Infallible, _, _>(name, args, || Ok(compute()), log_and_continue) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Best-effort form of [`get_or_try_compute`](Self::get_or_try_compute).
    pub fn get_or_try_compute_best_effort<E, F>(
        &self,
        name: &str,
        args: &Args,
        compute: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> std::result::Result<V, E>,
    {
        self.call(name, args, compute, log_and_continue)
    }

    /// Wraps `func` as a memoized function named `name`.
    ///
    /// `name` is the function identity used in the cache key; two wrappers
    /// with the same name over the same engine share entries.
    pub fn wrap<A, F>(&self, name: impl Into<String>, func: F) -> Memoized<A, V, F>
    where
        A: IntoArgs,
        F: Fn(A) -> V,
    {
        Memoized {
            name: name.into(),
            memo: self.clone(),
            func,
            _args: PhantomData,
        }
    }

    /// Hit/miss sequencing shared by every public entry point.
    ///
    /// `on_engine_error` decides whether an engine failure aborts the call
    /// (`Err`) or is tolerated (`Ok(())`).
    fn call<E, F, H>(
        &self,
        name: &str,
        args: &Args,
        compute: F,
        mut on_engine_error: H,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> std::result::Result<V, E>,
        H: FnMut(CacheError) -> std::result::Result<(), E>,
    {
        let key = self.key_fn.derive_key(name, args);

        match self.engine.get(&key) {
            Ok(Some(value)) => return Ok(self.hit(&key, value)),
            Ok(None) => {}
            Err(err) => {
                self.note_failure(FailedOp::Lookup);
                on_engine_error(err)?
            }
        }

        let _flight = match &self.flights {
            Some(flights) => {
                let guard = flights.acquire(&key);
                // Another caller may have stored the value while we waited.
                match self.engine.get(&key) {
                    Ok(Some(value)) => return Ok(self.hit(&key, value)),
                    Ok(None) => {}
                    Err(err) => {
                        self.note_failure(FailedOp::Lookup);
                        on_engine_error(err)?
                    }
                }
                Some(guard)
            }
            None => None,
        };

        #[cfg(feature = "stats")]
        self.stats.record(CacheEvent::Miss);
        debug!(key = %key, "memoize miss");

        let value = compute()?;
        match self.engine.set(&key, value.clone(), self.expiry) {
            Ok(()) => debug!(key = %key, expiry = ?self.expiry, "memoize stored"),
            Err(err) => {
                self.note_failure(FailedOp::Store);
                on_engine_error(err)?
            }
        }
        Ok(value)
    }

    fn hit(&self, key: &str, value: V) -> V {
        #[cfg(feature = "stats")]
        self.stats.record(CacheEvent::Hit);
        debug!(key = %key, "memoize hit");
        value
    }

    #[cfg_attr(not(feature = "stats"), allow(unused_variables))]
    fn note_failure(&self, op: FailedOp) {
        #[cfg(feature = "stats")]
        self.stats.record(match op {
            FailedOp::Lookup => CacheEvent::LookupFailed,
            FailedOp::Store => CacheEvent::StoreFailed,
        });
    }
}

#[derive(Clone, Copy)]
enum FailedOp {
    Lookup,
    Store,
}

fn log_and_continue<E>(err: CacheError) -> std::result::Result<(), E> {
    warn!(error = %err, "cache engine failed, continuing without cache");
    Ok(())
}

/// A function wrapped by [`Memoize::wrap`].
pub struct Memoized<A, V, F> {
    name: String,
    memo: Memoize<V>,
    func: F,
    _args: PhantomData<fn(A)>,
}

impl<A, V, F> Memoized<A, V, F>
where
    A: IntoArgs,
    V: Clone + 'static,
    F: Fn(A) -> V,
{
    /// Calls the function through the cache.
    pub fn call(&self, args: A) -> Result<V> {
        let key_args = args.to_args();
        self.memo
            .get_or_compute(&self.name, &key_args, || (self.func)(args))
    }

    /// Calls the wrapped function directly, bypassing the cache.
    pub fn call_uncached(&self, args: A) -> V {
        (self.func)(args)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn memoize(&self) -> &Memoize<V> {
        &self.memo
    }
}
