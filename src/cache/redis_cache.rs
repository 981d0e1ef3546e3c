//! Redis cache client
//!
//! - Write: `SETEX key ttl value` (value and expiry set atomically)
//! - Enumerate: `SCAN cursor MATCH pattern COUNT n`

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;

use super::CacheClient;
use crate::config::RedisConfig;
use crate::error::{CacheError, Result, SessionError};

/// Redis-backed cache client
///
/// Wraps a [`ConnectionManager`], which reconnects on its own after a dropped
/// connection. Cloning is cheap and clones share the connection.
///
/// # Example
///
/// ```rust,ignore
/// use redis_session_store::{RedisCache, RedisConfig};
///
/// let cache = RedisCache::connect(&RedisConfig::from_env()?).await?;
/// ```
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Open a managed connection to the configured server
    ///
    /// Fails with [`SessionError::Connectivity`] if the server cannot be reached.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.to_url()).map_err(|e| SessionError::InvalidConfig {
            key: "redis_host",
            reason: e.to_string(),
        })?;

        let mut manager_config = ConnectionManagerConfig::new();
        if let Some(timeout) = config.connection_timeout {
            manager_config = manager_config.set_connection_timeout(timeout);
        }
        if let Some(timeout) = config.response_timeout {
            manager_config = manager_config.set_response_timeout(timeout);
        }

        let conn = ConnectionManager::new_with_config(client, manager_config)
            .await
            .map_err(|e| {
                tracing::error!(
                    host = %config.host,
                    port = config.port,
                    error = %e,
                    "Error connecting to Redis"
                );
                SessionError::Connectivity(e.to_string())
            })?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            db = config.db,
            "Redis connection established"
        );
        Ok(Self { conn })
    }

    /// Create a cache client from an existing connection manager
    pub fn from_connection_manager(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CacheClient for RedisCache {
    async fn ping(&self) -> std::result::Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> std::result::Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let data: Option<String> = conn.get(key).await?;
        Ok(data)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> std::result::Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> std::result::Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        batch_size: usize,
    ) -> std::result::Result<(u64, Vec<String>), CacheError> {
        let mut conn = self.conn.clone();
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(batch_size)
            .query_async(&mut conn)
            .await?;
        Ok((next, keys))
    }
}

#[cfg(test)]
mod tests {
    // Tests require a running Redis instance
    // Run with: cargo test --features redis-store -- --ignored

    use super::*;

    #[tokio::test]
    #[ignore]
    async fn test_redis_cache_basic() {
        let cache = RedisCache::connect(&RedisConfig::new("127.0.0.1", 6379, 0))
            .await
            .unwrap();
        cache.ping().await.unwrap();

        cache
            .set_with_ttl("redis-cache-test:a", r#"{"user":"alice"}"#, 60)
            .await
            .unwrap();
        let value = cache.get("redis-cache-test:a").await.unwrap();
        assert_eq!(value.as_deref(), Some(r#"{"user":"alice"}"#));

        let mut cursor = 0;
        let mut keys = Vec::new();
        loop {
            let (next, page) = cache.scan(cursor, "redis-cache-test:*", 10).await.unwrap();
            keys.extend(page);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        assert!(keys.contains(&"redis-cache-test:a".to_string()));

        cache.delete("redis-cache-test:a").await.unwrap();
        assert_eq!(cache.get("redis-cache-test:a").await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore]
    async fn test_redis_cache_from_connection_manager() {
        let client = redis::Client::open("redis://127.0.0.1/").unwrap();
        let conn = ConnectionManager::new(client).await.unwrap();
        let cache = RedisCache::from_connection_manager(conn);

        cache.ping().await.unwrap();
        cache
            .set_with_ttl("redis-cache-test:shared", "{}", 60)
            .await
            .unwrap();
        assert_eq!(
            cache.get("redis-cache-test:shared").await.unwrap().as_deref(),
            Some("{}")
        );
        cache.delete("redis-cache-test:shared").await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_redis_cache_unreachable() {
        let config = RedisConfig::new("127.0.0.1", 1, 0)
            .with_connection_timeout(std::time::Duration::from_millis(200));
        let err = RedisCache::connect(&config).await.err().unwrap();
        assert!(matches!(err, SessionError::Connectivity(_)));
    }
}
