use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use tracing::{debug, warn};

use crate::{CacheEngine, CacheError, Expiry, Result};

/// Engine backed by a Redis server (`redis` feature).
///
/// Values are stored as JSON under the memoize key. An expiry becomes the
/// `EX` (whole seconds) or `PX` (anything finer) option of `SET`; `None`
/// stores without expiry and Redis evicts according to its own policy.
///
/// The client connects on first use. A connection that fails a command is
/// dropped and a new one is opened by the next call, so a restarted server
/// is picked up without rebuilding the engine.
///
/// ```no_run
/// use memora_core::{Args, Memoize, RedisEngine};
/// use std::time::Duration;
///
/// let engine = RedisEngine::open("redis://127.0.0.1:6379/0").unwrap();
/// let memo: Memoize<String> = Memoize::new(engine).with_expiry(Some(Duration::from_secs(60)));
/// let page = memo.get_or_compute("render", &Args::new().arg("home"), || "<html>".to_string());
/// ```
pub struct RedisEngine<V> {
    client: redis::Client,
    connection: Mutex<Option<redis::Connection>>,
    _value: PhantomData<fn() -> V>,
}

/// How an [`Expiry`] is expressed on a Redis `SET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetExpiry {
    Persist,
    Seconds(u64),
    Millis(u64),
}

fn set_expiry(expiry: Expiry) -> Result<SetExpiry> {
    let Some(duration) = expiry else {
        return Ok(SetExpiry::Persist);
    };
    if duration.is_zero() {
        return Err(CacheError::InvalidExpiry(
            "redis expiry must be greater than zero".to_string(),
        ));
    }
    if duration.subsec_nanos() == 0 {
        return Ok(SetExpiry::Seconds(duration.as_secs()));
    }

    // Round up so a sub-millisecond expiry never becomes `PX 0`.
    let millis = (duration.as_nanos() + 999_999) / 1_000_000;
    u64::try_from(millis)
        .map(SetExpiry::Millis)
        .map_err(|_| CacheError::InvalidExpiry(format!("{:?} is too long for redis", duration)))
}

impl<V> RedisEngine<V> {
    /// Parses `url` (`redis://host:port/db`). No connection is made yet.
    pub fn open(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(CacheError::backend)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            _value: PhantomData,
        })
    }

    /// Runs `command` on the pooled connection, opening one if needed.
    fn run<T>(
        &self,
        command: impl FnOnce(&mut redis::Connection) -> redis::RedisResult<T>,
    ) -> Result<T> {
        let mut slot = self.connection.lock();
        let mut connection = match slot.take() {
            Some(connection) => connection,
            None => {
                debug!("opening redis connection");
                self.client.get_connection().map_err(CacheError::backend)?
            }
        };

        let result = command(&mut connection).map_err(CacheError::backend);
        if result.is_ok() {
            *slot = Some(connection);
        }
        result
    }
}

impl<V> CacheEngine<V> for RedisEngine<V>
where
    V: Serialize + DeserializeOwned + Send + Sync,
{
    fn get(&self, key: &str) -> Result<Option<V>> {
        let raw: Option<Vec<u8>> =
            self.run(|connection| redis::cmd("GET").arg(key).query(connection))?;

        match raw {
            Some(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => Ok(Some(value)),
                Err(err) => {
                    warn!(key = %key, error = %err, "unreadable redis value, treating as a miss");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: V, expiry: Expiry) -> Result<()> {
        let mode = set_expiry(expiry)?;
        let payload = serde_json::to_vec(&value)?;

        let mut command = redis::cmd("SET");
        command.arg(key).arg(payload);
        match mode {
            SetExpiry::Persist => {}
            SetExpiry::Seconds(secs) => {
                command.arg("EX").arg(secs);
            }
            SetExpiry::Millis(millis) => {
                command.arg("PX").arg(millis);
            }
        }

        self.run(|connection| command.query::<()>(connection))?;
        debug!(key = %key, ?mode, "redis set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_no_expiry_persists() {
        assert_eq!(set_expiry(None).unwrap(), SetExpiry::Persist);
    }

    #[test]
    fn test_whole_seconds_use_ex() {
        assert_eq!(
            set_expiry(Some(Duration::from_secs(300))).unwrap(),
            SetExpiry::Seconds(300)
        );
    }

    #[test]
    fn test_fractions_use_px() {
        assert_eq!(
            set_expiry(Some(Duration::from_millis(1500))).unwrap(),
            SetExpiry::Millis(1500)
        );
        assert_eq!(
            set_expiry(Some(Duration::from_micros(10))).unwrap(),
            SetExpiry::Millis(1)
        );
    }

    #[test]
    fn test_zero_expiry_is_rejected() {
        assert!(matches!(
            set_expiry(Some(Duration::ZERO)),
            Err(CacheError::InvalidExpiry(_))
        ));
    }

    #[test]
    fn test_bad_url_is_a_backend_error() {
        let result: Result<RedisEngine<u8>> = RedisEngine::open("not a url");
        assert!(matches!(result, Err(CacheError::Backend(_))));
    }
}
