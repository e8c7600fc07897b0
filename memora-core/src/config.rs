//! Engine configuration.
//!
//! Selects and sizes a bundled engine from JSON or from environment
//! variables, so the backend of a memoized function can change without code
//! changes.
//!
//! # Environment Variables
//! - `MEMORA_ENGINE` - `memory`, `volatile`, `disk`, and with their features
//!   `redis` or `memcached` (default: `memory`)
//! - `MEMORA_CAPACITY` - Maximum entries of the memory engine (default: 1000)
//! - `MEMORA_TTL_SECS` - TTL in seconds of the memory engine (default: none)
//! - `MEMORA_POLICY` - `fifo`, `lru` or `random` (default: `lru`)
//! - `MEMORA_DISK_PATH` - Directory of the disk engine (default: `.memora`)
//! - `MEMORA_REDIS_URL` - Server of the redis engine (default: `redis://127.0.0.1:6379/0`)
//! - `MEMORA_MEMCACHED_URL` - Server of the memcached engine (default: `memcache://127.0.0.1:11211`)

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::{
    CacheEngine, CacheError, DiskEngine, EvictionPolicy, InMemoryEngine, Result, VolatileEngine,
};

pub const ENV_ENGINE: &str = "MEMORA_ENGINE";
pub const ENV_CAPACITY: &str = "MEMORA_CAPACITY";
pub const ENV_TTL_SECS: &str = "MEMORA_TTL_SECS";
pub const ENV_POLICY: &str = "MEMORA_POLICY";
pub const ENV_DISK_PATH: &str = "MEMORA_DISK_PATH";
pub const ENV_REDIS_URL: &str = "MEMORA_REDIS_URL";
pub const ENV_MEMCACHED_URL: &str = "MEMORA_MEMCACHED_URL";

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_POLICY: &str = "lru";
pub const DEFAULT_DISK_PATH: &str = ".memora";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";
pub const DEFAULT_MEMCACHED_URL: &str = "memcache://127.0.0.1:11211";

/// Which engine to build, and how.
///
/// Deserializes from a JSON object tagged by `kind`:
///
/// ```
/// use memora_core::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{"kind": "memory", "capacity": 64, "ttl_secs": 30}"#).unwrap();
/// assert_eq!(
///     config,
///     EngineConfig::Memory { capacity: 64, ttl_secs: Some(30), policy: "lru".to_string() }
/// );
///
/// let engine = config.build::<u64>().unwrap();
/// engine.set("answer", 42, None).unwrap();
/// assert_eq!(engine.get("answer").unwrap(), Some(42));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineConfig {
    /// [`InMemoryEngine`]
    Memory {
        #[serde(default = "default_capacity")]
        capacity: usize,
        #[serde(default)]
        ttl_secs: Option<u64>,
        #[serde(default = "default_policy")]
        policy: String,
    },
    /// [`VolatileEngine`]
    Volatile,
    /// [`DiskEngine`]
    Disk {
        #[serde(default = "default_disk_path")]
        path: PathBuf,
    },
    /// `RedisEngine`
    #[cfg(feature = "redis")]
    Redis {
        #[serde(default = "default_redis_url")]
        url: String,
    },
    /// `MemcachedEngine`
    #[cfg(feature = "memcache")]
    Memcached {
        #[serde(default = "default_memcached_url")]
        url: String,
    },
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_policy() -> String {
    DEFAULT_POLICY.to_string()
}

fn default_disk_path() -> PathBuf {
    PathBuf::from(DEFAULT_DISK_PATH)
}

#[cfg(feature = "redis")]
fn default_redis_url() -> String {
    DEFAULT_REDIS_URL.to_string()
}

#[cfg(feature = "memcache")]
fn default_memcached_url() -> String {
    DEFAULT_MEMCACHED_URL.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::Memory {
            capacity: DEFAULT_CAPACITY,
            ttl_secs: None,
            policy: default_policy(),
        }
    }
}

impl EngineConfig {
    /// Reads the configuration from `MEMORA_*` environment variables.
    ///
    /// Unset variables fall back to their defaults; set but malformed ones
    /// are a [`CacheError::Config`].
    pub fn from_env() -> Result<Self> {
        let kind = env::var(ENV_ENGINE).unwrap_or_else(|_| "memory".to_string());

        match kind.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(EngineConfig::Memory {
                capacity: parse_env(ENV_CAPACITY)?.unwrap_or(DEFAULT_CAPACITY),
                ttl_secs: parse_env(ENV_TTL_SECS)?,
                policy: env::var(ENV_POLICY).unwrap_or_else(|_| default_policy()),
            }),
            "volatile" => Ok(EngineConfig::Volatile),
            "disk" => Ok(EngineConfig::Disk {
                path: env::var_os(ENV_DISK_PATH)
                    .map(PathBuf::from)
                    .unwrap_or_else(default_disk_path),
            }),
            #[cfg(feature = "redis")]
            "redis" => Ok(EngineConfig::Redis {
                url: env::var(ENV_REDIS_URL).unwrap_or_else(|_| default_redis_url()),
            }),
            #[cfg(feature = "memcache")]
            "memcached" => Ok(EngineConfig::Memcached {
                url: env::var(ENV_MEMCACHED_URL).unwrap_or_else(|_| default_memcached_url()),
            }),
            other => Err(CacheError::Config(format!(
                "{}: unknown engine `{}` (expected one of {})",
                ENV_ENGINE,
                other,
                known_engines().join(", ")
            ))),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds the configured engine.
    ///
    /// The value bounds cover every bundled engine, the disk engine needing
    /// serde support.
    pub fn build<V>(&self) -> Result<Arc<dyn CacheEngine<V>>>
    where
        V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let engine: Arc<dyn CacheEngine<V>> = match self {
            EngineConfig::Memory {
                capacity,
                ttl_secs,
                policy,
            } => {
                if *capacity == 0 {
                    return Err(CacheError::Config(
                        "memory engine capacity must be greater than zero".to_string(),
                    ));
                }
                let mut engine = InMemoryEngine::new(*capacity).with_policy(parse_policy(policy)?);
                match ttl_secs {
                    Some(0) => {
                        return Err(CacheError::Config(
                            "memory engine ttl must be greater than zero".to_string(),
                        ))
                    }
                    Some(secs) => engine = engine.with_ttl(Duration::from_secs(*secs)),
                    None => {}
                }
                Arc::new(engine)
            }
            EngineConfig::Volatile => Arc::new(VolatileEngine::new()),
            EngineConfig::Disk { path } => Arc::new(DiskEngine::open(path)?),
            #[cfg(feature = "redis")]
            EngineConfig::Redis { url } => Arc::new(crate::RedisEngine::open(url)?),
            #[cfg(feature = "memcache")]
            EngineConfig::Memcached { url } => Arc::new(crate::MemcachedEngine::connect(url)?),
        };

        debug!(config = ?self, "built cache engine");
        Ok(engine)
    }
}

/// Engine names accepted by `MEMORA_ENGINE` in this build.
fn known_engines() -> Vec<&'static str> {
    #[allow(unused_mut)]
    let mut names = vec!["memory", "volatile", "disk"];
    #[cfg(feature = "redis")]
    names.push("redis");
    #[cfg(feature = "memcache")]
    names.push("memcached");
    names
}

/// Strict counterpart of `EvictionPolicy::from`: unknown names are an error.
fn parse_policy(name: &str) -> Result<EvictionPolicy> {
    match name.trim().to_ascii_lowercase().as_str() {
        "fifo" | "lru" | "random" => Ok(EvictionPolicy::from(name.trim())),
        other => Err(CacheError::Config(format!(
            "unknown eviction policy `{}` (expected fifo, lru or random)",
            other
        ))),
    }
}

fn parse_env<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| CacheError::Config(format!("{}=`{}`: {}", name, raw, err))),
        Err(_) => Ok(None),
    }
}
