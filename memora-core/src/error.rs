//! Error types shared by every cache engine.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for cache engines and the memoize decorator.
///
/// A missing key is never an error: engines report it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The engine owns its expiry policy and was handed a different one at call time.
    #[error(
        "per-call expiry {requested:?} is not supported by this engine \
         (configured ttl: {configured:?}); set the ttl when constructing the engine"
    )]
    UnsupportedExpiry {
        requested: Duration,
        configured: Option<Duration>,
    },

    /// The engine cannot represent the requested expiry.
    #[error("invalid expiry: {0}")]
    InvalidExpiry(String),

    /// Filesystem failure in an on-disk engine
    #[error("cache i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure reported by a user-provided backend (network client, database, ...)
    #[error("cache backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid engine configuration
    #[error("invalid cache configuration: {0}")]
    Config(String),
}

impl CacheError {
    /// Wraps an arbitrary client error as [`CacheError::Backend`].
    ///
    /// # Examples
    ///
    /// ```
    /// use memora_core::CacheError;
    ///
    /// let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
    /// let err = CacheError::backend(io);
    /// assert!(err.to_string().contains("refused"));
    /// ```
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CacheError::Backend(Box::new(err))
    }
}

/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_expiry_message() {
        let err = CacheError::UnsupportedExpiry {
            requested: Duration::from_secs(10),
            configured: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("10s"));
        assert!(msg.contains("None"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CacheError = io.into();
        assert!(matches!(err, CacheError::Io(_)));
    }

    #[test]
    fn test_backend_keeps_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = CacheError::backend(io);
        assert!(err.source().is_some());
    }
}
