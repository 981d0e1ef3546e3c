//! Session store backed by a key-value cache
//!
//! All session state lives in the cache; the store itself only holds a client
//! handle and its configuration, so it can be cloned freely and shared across
//! request handlers.
//!
//! Reads never fail because of the cache: a malformed identifier, a miss, a
//! corrupt payload or (under [`FaultPolicy::Degrade`]) an unreachable server
//! all produce a usable empty session.

use std::sync::Arc;

use crate::cache::CacheClient;
use crate::config::{FaultPolicy, KeyStrategy, SessionConfig};
use crate::error::{CacheError, Result, SessionError};
use crate::id::SessionId;
use crate::session::{Session, SessionRecord};

/// Session store over a [`CacheClient`]
///
/// # Example
///
/// ```rust,ignore
/// use redis_session_store::{MemoryCache, SessionConfig, SessionStore};
///
/// let store = SessionStore::connect(MemoryCache::new(), SessionConfig::default()).await?;
/// let mut session = store.create()?;
/// session.set("uid", 42);
/// store.save_session(&session).await?;
/// ```
pub struct SessionStore<C: CacheClient> {
    cache: Arc<C>,
    config: SessionConfig,
}

impl<C: CacheClient> SessionStore<C> {
    /// Create a store after checking that the cache answers
    ///
    /// This is the only operation where an unreachable cache is fatal: the
    /// store must not serve requests until it succeeds.
    pub async fn connect(cache: C, config: SessionConfig) -> Result<Self> {
        if let Err(e) = cache.ping().await {
            tracing::error!(error = %e, "Session cache is not responding");
            return Err(SessionError::Connectivity(e.to_string()));
        }

        tracing::info!(
            ttl_secs = config.ttl_secs(),
            renew_missing = config.renew_missing,
            key_strategy = ?config.key_strategy,
            "Session store ready"
        );
        Ok(Self {
            cache: Arc::new(cache),
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The cache key an identifier is stored under
    pub fn cache_key(&self, id: &SessionId) -> String {
        let sid = id.as_str();
        match self.config.key_strategy {
            KeyStrategy::FullIdentifier => format!("{}{}", self.config.key_prefix, sid),
            KeyStrategy::Truncated(len) => {
                format!("{}{}", self.config.key_prefix, &sid[..len.min(sid.len())])
            }
        }
    }

    /// Apply the fault policy to a failed cache call
    fn absorb<T>(&self, operation: &'static str, err: CacheError, fallback: T) -> Result<T> {
        metrics::counter!("session_store_cache_faults_total", "operation" => operation)
            .increment(1);

        match self.config.fault_policy {
            FaultPolicy::Degrade => {
                tracing::error!(
                    operation,
                    error = %err,
                    "Session cache operation failed, degrading"
                );
                Ok(fallback)
            }
            FaultPolicy::Propagate => {
                tracing::warn!(operation, error = %err, "Session cache operation failed");
                Err(err.into())
            }
        }
    }

    /// Mint a new session with an empty record
    ///
    /// Nothing is written until the session is saved.
    pub fn create(&self) -> Result<Session> {
        Ok(Session::new(SessionId::generate()?))
    }

    /// Load the session for a raw identifier
    pub async fn read(&self, sid: &str) -> Result<Session> {
        let id = match SessionId::parse(sid) {
            Ok(id) => id,
            Err(_) => {
                tracing::debug!(len = sid.len(), "Malformed session id, starting a new session");
                return self.create();
            }
        };

        let key = self.cache_key(&id);
        let payload = match self.cache.get(&key).await {
            Ok(payload) => payload,
            Err(e) => {
                self.absorb("get", e, ())?;
                return Ok(Session::existing(id, SessionRecord::new()));
            }
        };

        let Some(payload) = payload else {
            tracing::debug!(
                sid = %id.redacted(),
                "Session not found in cache, using an empty session"
            );
            if self.config.renew_missing {
                return self.create();
            }
            return Ok(Session::existing(id, SessionRecord::new()));
        };

        match serde_json::from_str::<SessionRecord>(&payload) {
            Ok(record) => Ok(Session::existing(id, record)),
            Err(e) => {
                tracing::debug!(
                    sid = %id.redacted(),
                    error = %e,
                    "Failed to decode session data, using an empty session"
                );
                Ok(Session::existing(id, SessionRecord::new()))
            }
        }
    }

    /// Persist `record` under `sid` with the configured TTL
    ///
    /// Fails with [`SessionError::InvalidIdentifier`] before touching the cache
    /// if `sid` is malformed.
    pub async fn save(&self, sid: &str, record: &SessionRecord) -> Result<()> {
        let id = SessionId::parse(sid)?;
        let key = self.cache_key(&id);
        let payload = serde_json::to_string(record)?;

        let result = if !self.config.ttl.is_zero() {
            self.cache
                .set_with_ttl(&key, &payload, self.config.ttl_secs())
                .await
        } else {
            // A zero lifetime means the session should not outlive this request
            self.cache.delete(&key).await
        };

        match result {
            Ok(()) => {
                tracing::trace!(sid = %id.redacted(), bytes = payload.len(), "Session saved");
                Ok(())
            }
            Err(e) => self.absorb("set", e, ()),
        }
    }

    /// Persist a session's record under its identifier
    pub async fn save_session(&self, session: &Session) -> Result<()> {
        self.save(session.id().as_str(), session.record()).await
    }

    /// Remove the stored session for `sid`
    ///
    /// Malformed identifiers are ignored without a cache call.
    pub async fn delete(&self, sid: &str) -> Result<()> {
        let Ok(id) = SessionId::parse(sid) else {
            tracing::debug!(len = sid.len(), "Ignoring delete for malformed session id");
            return Ok(());
        };

        match self.cache.delete(&self.cache_key(&id)).await {
            Ok(()) => Ok(()),
            Err(e) => self.absorb("delete", e, ()),
        }
    }

    /// Move a session's record to a freshly minted identifier
    ///
    /// The old entry is deleted (best-effort). The returned session is marked
    /// modified and must be saved by the caller.
    pub async fn rotate(&self, session: Session) -> Result<Session> {
        let new_id = SessionId::generate()?;
        self.delete(session.id().as_str()).await?;
        Ok(session.rebind(new_id))
    }

    /// Every key in the session namespace
    ///
    /// Walks SCAN pages until the cursor returns to zero. Keys repeated across
    /// pages are reported once.
    pub async fn list(&self) -> Result<Vec<String>> {
        let pattern = format!("{}*", escape_pattern(&self.config.key_prefix));
        let batch_size = self.config.scan_batch_size.max(1);
        let mut seen = std::collections::HashSet::new();
        let mut keys = Vec::new();
        let mut cursor = 0;

        loop {
            let (next, page) = match self
                .cache
                .scan(cursor, &pattern, batch_size)
                .await
            {
                Ok(page) => page,
                Err(e) => return self.absorb("scan", e, Vec::new()),
            };

            for key in page {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(keys)
    }

    /// Expire stale sessions
    ///
    /// A no-op: the cache server expires entries by TTL. There is nothing on
    /// disk to clean up.
    pub async fn collect_garbage(&self) {
        tracing::trace!("Session expiry is handled by the cache TTL");
    }
}

/// Backslash-escape `MATCH` metacharacters so `literal` only matches itself
fn escape_pattern(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl<C: CacheClient> Clone for SessionStore<C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            config: self.config.clone(),
        }
    }
}

#[cfg(feature = "redis-store")]
impl SessionStore<crate::cache::RedisCache> {
    /// Connect to Redis and create a store over it
    pub async fn connect_redis(
        redis: &crate::config::RedisConfig,
        config: SessionConfig,
    ) -> Result<Self> {
        let cache = crate::cache::RedisCache::connect(redis).await?;
        Self::connect(cache, config).await
    }
}
