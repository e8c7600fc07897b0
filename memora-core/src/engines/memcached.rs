use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Cow;
use std::marker::PhantomData;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::{CacheEngine, CacheError, Expiry, Result};

/// Longest key the memcached text protocol accepts.
const MAX_KEY_LEN: usize = 250;

/// Beyond this many seconds memcached reads an expiration as a unix timestamp.
const MAX_RELATIVE_SECS: u64 = 60 * 60 * 24 * 30;

/// Engine backed by one or more memcached servers (`memcache` feature).
///
/// Values are stored as JSON strings. An expiry becomes the item's
/// expiration time: whole seconds, rounded up, and converted to an absolute
/// timestamp past memcached's 30 day limit for relative times. `None` stores
/// the item without expiration.
///
/// Memoize keys longer than 250 bytes, or containing whitespace or control
/// characters, are replaced by their BLAKE3 digest.
///
/// ```no_run
/// use memora_core::{Args, MemcachedEngine, Memoize};
/// use std::time::Duration;
///
/// let engine = MemcachedEngine::connect("memcache://127.0.0.1:11211").unwrap();
/// let memo: Memoize<Vec<u32>> = Memoize::new(engine).with_expiry(Some(Duration::from_secs(90)));
/// let ids = memo.get_or_compute("ids", &Args::new(), || vec![1, 2, 3]);
/// ```
pub struct MemcachedEngine<V> {
    client: memcache::Client,
    _value: PhantomData<fn() -> V>,
}

impl<V> MemcachedEngine<V> {
    /// Connects to `url` (`memcache://host:port`).
    pub fn connect(url: &str) -> Result<Self> {
        let client = memcache::Client::connect(url).map_err(CacheError::backend)?;
        Ok(Self {
            client,
            _value: PhantomData,
        })
    }
}

/// Expiration field of a memcached `set` for `expiry`, `0` meaning none.
fn expiration(expiry: Expiry, now: SystemTime) -> Result<u32> {
    let Some(duration) = expiry else {
        return Ok(0);
    };
    if duration.is_zero() {
        return Err(CacheError::InvalidExpiry(
            "memcached expiry must be greater than zero".to_string(),
        ));
    }

    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    let field = if secs <= MAX_RELATIVE_SECS {
        secs
    } else {
        let since_epoch = now
            .duration_since(UNIX_EPOCH)
            .map_err(|err| CacheError::InvalidExpiry(err.to_string()))?;
        since_epoch.as_secs().saturating_add(secs)
    };

    u32::try_from(field).map_err(|_| {
        CacheError::InvalidExpiry(format!("{:?} is too long for memcached", duration))
    })
}

fn storage_key(key: &str) -> Cow<'_, str> {
    let usable = key.len() <= MAX_KEY_LEN && key.bytes().all(|b| b > b' ' && b != 0x7f);
    if usable {
        Cow::Borrowed(key)
    } else {
        Cow::Owned(format!("memora:{}", blake3::hash(key.as_bytes()).to_hex()))
    }
}

impl<V> CacheEngine<V> for MemcachedEngine<V>
where
    V: Serialize + DeserializeOwned + Send + Sync,
{
    fn get(&self, key: &str) -> Result<Option<V>> {
        let stored = storage_key(key);
        let raw: Option<String> = self.client.get(&stored).map_err(CacheError::backend)?;

        match raw {
            Some(json) => match serde_json::from_str(&json) {
                Ok(value) => Ok(Some(value)),
                Err(err) => {
                    warn!(key = %key, error = %err, "unreadable memcached value, treating as a miss");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: V, expiry: Expiry) -> Result<()> {
        let expiration = expiration(expiry, SystemTime::now())?;
        let json = serde_json::to_string(&value)?;
        let stored = storage_key(key);

        self.client
            .set(&stored, json.as_str(), expiration)
            .map_err(CacheError::backend)?;
        debug!(key = %key, expiration, "memcached set");
        Ok(())
    }
}
