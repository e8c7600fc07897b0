//! Cache key derivation.
//!
//! A key is built from the memoized function's name plus its arguments, each
//! argument first coerced to a string through [`CacheableKey`]. The default
//! layout nests two separators:
//!
//! ```text
//! {name}||PARAMS:{n}||{p1}|{p2}|...[||KWARGS:{m}||{k1}={v1}|...]
//! ```
//!
//! Every component is escaped (`\`, `|` and `=` get a backslash, whitespace
//! becomes `\u{hex}`), so the finished key holds no whitespace and two
//! different argument lists never map to the same key.

use std::collections::BTreeMap;
use std::fmt::Debug;

/// Outer separator between the name, the positional group and the keyword group.
pub const GROUP_SEPARATOR: &str = "||";

/// Inner separator between the items of one group.
pub const ITEM_SEPARATOR: char = '|';

/// Types that can produce the string form used inside a cache key.
///
/// Implement this directly when the `Debug` output is large or unstable:
///
/// ```
/// use memora_core::CacheableKey;
///
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// impl CacheableKey for User {
///     fn to_cache_key(&self) -> String {
///         format!("user:{}", self.id)
///     }
/// }
///
/// let user = User { id: 7, name: "Ann".into() };
/// assert_eq!(user.to_cache_key(), "user:7");
/// ```
pub trait CacheableKey {
    fn to_cache_key(&self) -> String;
}

/// Opt-in marker deriving [`CacheableKey`] from the type's `Debug` output.
///
/// ```
/// use memora_core::{CacheableKey, DefaultCacheableKey};
///
/// #[derive(Debug)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl DefaultCacheableKey for Point {}
///
/// assert_eq!(Point { x: 1, y: 2 }.to_cache_key(), "Point { x: 1, y: 2 }");
/// ```
///
/// Implement either this marker or `CacheableKey`, not both.
pub trait DefaultCacheableKey: Debug {}

impl<T: DefaultCacheableKey + ?Sized> CacheableKey for T {
    fn to_cache_key(&self) -> String {
        format!("{:?}", self)
    }
}

macro_rules! default_cacheable {
    ($($t:ty),* $(,)?) => {
        $(impl DefaultCacheableKey for $t {})*
    };
}

default_cacheable!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char, str,
    String, ()
);

impl<T: DefaultCacheableKey + ?Sized> DefaultCacheableKey for &T {}
impl<T: Debug> DefaultCacheableKey for Option<T> {}
impl<T: Debug> DefaultCacheableKey for Vec<T> {}
impl<T: Debug> DefaultCacheableKey for [T] {}

macro_rules! default_cacheable_tuple {
    ($($name:ident),+) => {
        impl<$($name: Debug),+> DefaultCacheableKey for ($($name,)+) {}
    };
}

default_cacheable_tuple!(A);
default_cacheable_tuple!(A, B);
default_cacheable_tuple!(A, B, C);
default_cacheable_tuple!(A, B, C, D);
default_cacheable_tuple!(A, B, C, D, E);
default_cacheable_tuple!(A, B, C, D, E, F);
default_cacheable_tuple!(A, B, C, D, E, F, G);
default_cacheable_tuple!(A, B, C, D, E, F, G, H);

/// The arguments of one call, already coerced to strings.
///
/// Positional arguments keep their order. Keyword arguments are kept sorted by
/// name, so the order in which they are supplied does not change the key.
///
/// # Examples
///
/// ```
/// use memora_core::Args;
///
/// let args = Args::new().arg(&1).arg("two").kwarg("scale", &2.5);
/// assert_eq!(args.positional(), ["1", "\"two\""]);
/// assert_eq!(args.keyword()["scale"], "2.5");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    positional: Vec<String>,
    keyword: BTreeMap<String, String>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg<T: CacheableKey + ?Sized>(mut self, value: &T) -> Self {
        self.push(value);
        self
    }

    /// Sets a keyword argument, replacing an earlier value under the same name.
    pub fn kwarg<T: CacheableKey + ?Sized>(mut self, name: &str, value: &T) -> Self {
        self.insert(name, value);
        self
    }

    pub fn push<T: CacheableKey + ?Sized>(&mut self, value: &T) {
        self.positional.push(value.to_cache_key());
    }

    pub fn insert<T: CacheableKey + ?Sized>(&mut self, name: &str, value: &T) {
        self.keyword.insert(name.to_string(), value.to_cache_key());
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn keyword(&self) -> &BTreeMap<String, String> {
        &self.keyword
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}

/// Argument lists a [`Memoized`](crate::Memoized) function can be called with.
///
/// Implemented for `()` and for tuples of up to eight [`CacheableKey`] values;
/// each element becomes one positional argument. A single argument is passed
/// as a one-element tuple: `(x,)`.
pub trait IntoArgs {
    fn to_args(&self) -> Args;
}

impl IntoArgs for () {
    fn to_args(&self) -> Args {
        Args::new()
    }
}

impl IntoArgs for Args {
    fn to_args(&self) -> Args {
        self.clone()
    }
}

macro_rules! into_args_tuple {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: CacheableKey),+> IntoArgs for ($($name,)+) {
            fn to_args(&self) -> Args {
                Args::new()$(.arg(&self.$idx))+
            }
        }
    };
}

into_args_tuple!(A.0);
into_args_tuple!(A.0, B.1);
into_args_tuple!(A.0, B.1, C.2);
into_args_tuple!(A.0, B.1, C.2, D.3);
into_args_tuple!(A.0, B.1, C.2, D.3, E.4);
into_args_tuple!(A.0, B.1, C.2, D.3, E.4, F.5);
into_args_tuple!(A.0, B.1, C.2, D.3, E.4, F.5, G.6);
into_args_tuple!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);

/// Maps a function name and its arguments to a cache key.
///
/// Implemented for every `Fn(&str, &Args) -> String + Send + Sync`, so plain
/// functions such as [`default_key`] and [`hashed_key`] and closures can be
/// plugged into [`Memoize::with_key_fn`](crate::Memoize::with_key_fn).
/// Implementations must be deterministic and free of I/O: they run on every
/// call, hits included.
pub trait KeyFn: Send + Sync {
    fn derive_key(&self, name: &str, args: &Args) -> String;
}

impl<F> KeyFn for F
where
    F: Fn(&str, &Args) -> String + Send + Sync,
{
    fn derive_key(&self, name: &str, args: &Args) -> String {
        self(name, args)
    }
}

/// Default key function.
///
/// Keyword arguments are part of the key: calls that differ only in a keyword
/// value never share an entry.
///
/// # Examples
///
/// ```
/// use memora_core::{default_key, Args};
///
/// let key = default_key("square", &Args::new().arg(&4));
/// assert_eq!(key, "square||PARAMS:1||4");
///
/// let key = default_key("greet", &Args::new().arg("hi there"));
/// assert_eq!(key, r#"greet||PARAMS:1||"hi\u{20}there""#);
///
/// let key = default_key("scale", &Args::new().arg(&2).kwarg("by", &3));
/// assert_eq!(key, "scale||PARAMS:1||2||KWARGS:1||by=3");
/// ```
pub fn default_key(name: &str, args: &Args) -> String {
    let mut key = escape(name);
    key.push_str(GROUP_SEPARATOR);
    key.push_str(&params_section(args));
    key
}

/// Key function that replaces the argument section with its BLAKE3 digest.
///
/// Keys stay short no matter how large the arguments are.
///
/// ```
/// use memora_core::{hashed_key, Args};
///
/// let big = "x".repeat(10_000);
/// let key = hashed_key("load", &Args::new().arg(&big));
/// assert!(key.starts_with("load||BLAKE3||"));
/// assert_eq!(key.len(), "load||BLAKE3||".len() + 64);
/// ```
pub fn hashed_key(name: &str, args: &Args) -> String {
    let digest = blake3::hash(params_section(args).as_bytes());
    let mut key = escape(name);
    key.push_str(GROUP_SEPARATOR);
    key.push_str("BLAKE3");
    key.push_str(GROUP_SEPARATOR);
    key.push_str(digest.to_hex().as_str());
    key
}

fn params_section(args: &Args) -> String {
    let mut out = String::new();
    out.push_str("PARAMS:");
    out.push_str(&args.positional.len().to_string());
    out.push_str(GROUP_SEPARATOR);
    for (i, value) in args.positional.iter().enumerate() {
        if i > 0 {
            out.push(ITEM_SEPARATOR);
        }
        escape_into(&mut out, value);
    }

    if !args.keyword.is_empty() {
        out.push_str(GROUP_SEPARATOR);
        out.push_str("KWARGS:");
        out.push_str(&args.keyword.len().to_string());
        out.push_str(GROUP_SEPARATOR);
        for (i, (name, value)) in args.keyword.iter().enumerate() {
            if i > 0 {
                out.push(ITEM_SEPARATOR);
            }
            escape_into(&mut out, name);
            out.push('=');
            escape_into(&mut out, value);
        }
    }
    out
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    escape_into(&mut out, s);
    out
}

fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '\\' | '|' | '=' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_whitespace() => {
                out.push_str(&format!("\\u{{{:x}}}", c as u32));
            }
            c => out.push(c),
        }
    }
}
