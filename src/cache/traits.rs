//! Cache client trait

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::CacheError;

/// The key-value cache the session store persists into
///
/// Every method is a round-trip to a remote service. Implementations own
/// their timeout and reconnect behaviour; callers add no deadlines or retries.
#[async_trait]
pub trait CacheClient: Send + Sync + 'static {
    /// Liveness probe
    async fn ping(&self) -> Result<(), CacheError>;

    /// Get the value stored at `key`, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Write `value` at `key` and set its expiry in one atomic step
    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;

    /// Delete `key`; deleting an absent key is not an error
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// One page of a cursor-based key scan
    ///
    /// Start with cursor 0. The iteration is complete when the returned
    /// cursor is 0 again. A page may be empty and keys may repeat.
    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        batch_size: usize,
    ) -> Result<(u64, Vec<String>), CacheError>;
}

#[async_trait]
impl<C: CacheClient + ?Sized> CacheClient for Arc<C> {
    async fn ping(&self) -> Result<(), CacheError> {
        (**self).ping().await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        (**self).get(key).await
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        (**self).set_with_ttl(key, value, ttl_secs).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        (**self).delete(key).await
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        batch_size: usize,
    ) -> Result<(u64, Vec<String>), CacheError> {
        (**self).scan(cursor, pattern, batch_size).await
    }
}
