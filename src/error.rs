//! Session error types

/// Errors raised by a [`CacheClient`](crate::cache::CacheClient) implementation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The cache server could not be reached (refused, dropped, timed out)
    #[error("Cache connection error: {0}")]
    Connection(String),
    /// The cache server answered but the command failed
    #[error("Cache command error: {0}")]
    Command(String),
}

/// Errors that can occur during session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Malformed session identifier
    #[error("Invalid session ID: {0}")]
    InvalidIdentifier(String),

    /// The cache did not answer the startup liveness probe
    #[error("Cache server is not responding: {0}")]
    Connectivity(String),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The OS random source could not be read
    #[error("Entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    /// A steady-state cache fault surfaced under `FaultPolicy::Propagate`
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A required configuration option is absent
    #[error("Missing configuration option: {0}")]
    MissingConfig(&'static str),

    /// A configuration option could not be parsed
    #[error("Invalid configuration option {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(feature = "redis-store")]
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Command(err.to_string())
        }
    }
}
