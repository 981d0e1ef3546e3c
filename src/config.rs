//! Session store and cache connection configuration

use std::time::Duration;

use crate::error::{Result, SessionError};

/// Default session lifetime (one week)
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// Default number of keys requested per SCAN page
pub const DEFAULT_SCAN_BATCH_SIZE: usize = 100;

/// Key length used by the legacy truncated layout
pub const LEGACY_KEY_LEN: usize = 2;

/// How a session identifier maps onto a cache key
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyStrategy {
    /// `prefix + identifier`; one cache entry per session
    FullIdentifier,
    /// `prefix + first n characters of the identifier`
    ///
    /// Lossy: every identifier sharing those characters lands on the same
    /// entry, and the last write wins. Only for reading keys written by the
    /// legacy layout.
    Truncated(usize),
}

/// What the store does when a steady-state cache call fails
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultPolicy {
    /// Log and count the fault, then return the safe default
    /// (empty session, no-op save/delete, empty list)
    Degrade,
    /// Return the fault to the caller as [`SessionError::Cache`]
    Propagate,
}

/// Configuration for the session store
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Lifetime attached to every write (default: 7 days).
    /// Expiry is enforced by the cache server.
    pub ttl: Duration,

    /// On a cache miss, mint a new identifier instead of reusing the
    /// requested one (default: false)
    pub renew_missing: bool,

    /// Namespace prepended to every cache key (default: "sess:")
    pub key_prefix: String,

    /// Identifier to cache key mapping (default: full identifier)
    pub key_strategy: KeyStrategy,

    /// Cache fault handling (default: degrade)
    pub fault_policy: FaultPolicy,

    /// COUNT hint for SCAN pages (default: 100)
    pub scan_batch_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            renew_missing: false,
            key_prefix: "sess:".to_string(),
            key_strategy: KeyStrategy::FullIdentifier,
            fault_policy: FaultPolicy::Degrade,
            scan_batch_size: DEFAULT_SCAN_BATCH_SIZE,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// The historic key layout: no namespace, two-character keys
    pub fn legacy() -> Self {
        Self {
            key_prefix: String::new(),
            key_strategy: KeyStrategy::Truncated(LEGACY_KEY_LEN),
            ..Default::default()
        }
    }

    /// Set the session lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set whether a cache miss mints a new identifier
    pub fn with_renew_missing(mut self, renew: bool) -> Self {
        self.renew_missing = renew;
        self
    }

    /// Set the cache key namespace
    pub fn with_key_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.key_strategy = strategy;
        self
    }

    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    /// TTL in whole seconds as the cache expects it
    ///
    /// Fractions round up, so any non-zero lifetime stays non-zero.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs() + u64::from(self.ttl.subsec_nanos() > 0)
    }

    /// Set the SCAN page size hint; zero is raised to one
    pub fn with_scan_batch_size(mut self, size: usize) -> Self {
        self.scan_batch_size = size.max(1);
        self
    }
}

/// Options recognized for the cache connection
pub const OPT_HOST: &str = "redis_host";
pub const OPT_PORT: &str = "redis_port";
pub const OPT_DB: &str = "redis_db_num";

/// Connection settings for the Redis cache
#[derive(Clone, Debug, PartialEq)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    /// Logical database index
    pub db: i64,
    /// Connect timeout handed to the client (None: client default)
    pub connection_timeout: Option<Duration>,
    /// Per-command response timeout handed to the client (None: client default)
    pub response_timeout: Option<Duration>,
}

impl RedisConfig {
    pub fn new<S: Into<String>>(host: S, port: u16, db: i64) -> Self {
        Self {
            host: host.into(),
            port,
            db,
            connection_timeout: None,
            response_timeout: None,
        }
    }

    /// Build from named options (`redis_host`, `redis_port`, `redis_db_num`)
    ///
    /// All three are required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(SessionError::MissingConfig(key))
        };

        let host = require(OPT_HOST)?;
        let port = require(OPT_PORT)?
            .parse::<u16>()
            .map_err(|e| SessionError::InvalidConfig {
                key: OPT_PORT,
                reason: e.to_string(),
            })?;
        let db = require(OPT_DB)?
            .parse::<i64>()
            .map_err(|e| SessionError::InvalidConfig {
                key: OPT_DB,
                reason: e.to_string(),
            })?;
        if db < 0 {
            return Err(SessionError::InvalidConfig {
                key: OPT_DB,
                reason: "must not be negative".to_string(),
            });
        }

        Ok(Self::new(host, port, db))
    }

    /// Build from `REDIS_HOST`, `REDIS_PORT` and `REDIS_DB_NUM`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key.to_uppercase()).ok())
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = Some(timeout);
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    /// Connection URL understood by the redis client
    pub fn to_url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}
