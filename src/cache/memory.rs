//! In-memory cache client
//!
//! This is primarily for development and testing.
//! For production, use RedisCache or another shared cache.
//!
//! Entries expire like they would on a cache server, SCAN pages through keys
//! with a numeric cursor, and the client can be switched offline to simulate
//! a lost connection.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::CacheClient;
use crate::error::CacheError;

struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Default)]
struct Counters {
    writes: AtomicUsize,
    deletes: AtomicUsize,
    failed: AtomicUsize,
}

/// In-memory cache client
///
/// Clones share the same entries, so a test can keep a handle while the
/// store owns another.
///
/// Warning: This cache is not suitable for production use because:
/// - Entries are lost on restart
/// - Entries are not shared across processes
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    offline: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl MemoryCache {
    /// Create a new, empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a lost (or restored) connection
    ///
    /// While offline every call fails with [`CacheError::Connection`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful `set_with_ttl` calls
    pub fn writes(&self) -> usize {
        self.counters.writes.load(Ordering::SeqCst)
    }

    /// Number of successful `delete` calls
    pub fn deletes(&self) -> usize {
        self.counters.deletes.load(Ordering::SeqCst)
    }

    /// Number of calls rejected while offline
    pub fn failed_calls(&self) -> usize {
        self.counters.failed.load(Ordering::SeqCst)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.cleanup_expired();
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.write().retain(|_, entry| entry.expires_at > now);
    }

    fn check_online(&self) -> Result<(), CacheError> {
        if self.offline.load(Ordering::SeqCst) {
            self.counters.failed.fetch_add(1, Ordering::SeqCst);
            return Err(CacheError::Connection(
                "memory cache is offline".to_string(),
            ));
        }
        Ok(())
    }
}

/// Compile a Redis `MATCH` pattern
///
/// Redis escapes a metacharacter with `\\` and negates a class with `[^`;
/// glob spells those `[*]` and `[!`.
fn redis_pattern(pattern: &str) -> Result<glob::Pattern, CacheError> {
    let mut translated = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => {
                    translated.push_str(&glob::Pattern::escape(&escaped.to_string()));
                }
                None => translated.push('\\'),
            },
            '[' => {
                translated.push('[');
                if chars.next_if_eq(&'^').is_some() {
                    translated.push('!');
                }
            }
            _ => translated.push(c),
        }
    }

    glob::Pattern::new(&translated).map_err(|e| {
        CacheError::Command(format!("invalid MATCH pattern {:?}: {}", pattern, e))
    })
}

#[async_trait]
impl CacheClient for MemoryCache {
    async fn ping(&self) -> Result<(), CacheError> {
        self.check_online()
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check_online()?;
        let entries = self.entries.read();

        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        self.check_online()?;
        if ttl_secs == 0 {
            return Err(CacheError::Command(
                "invalid expire time in 'setex' command".to_string(),
            ));
        }

        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + Duration::from_secs(ttl_secs),
        };
        self.entries.write().insert(key.to_string(), entry);
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.check_online()?;
        self.entries.write().remove(key);
        self.counters.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        batch_size: usize,
    ) -> Result<(u64, Vec<String>), CacheError> {
        self.check_online()?;
        self.cleanup_expired();
        let matcher = redis_pattern(pattern)?;

        let mut keys: Vec<String> = self
            .entries
            .read()
            .keys()
            .filter(|k| matcher.matches(k))
            .cloned()
            .collect();
        keys.sort();

        let start = usize::try_from(cursor).unwrap_or(usize::MAX).min(keys.len());
        let end = start.saturating_add(batch_size.max(1)).min(keys.len());
        let next = if end >= keys.len() { 0 } else { end as u64 };

        Ok((next, keys[start..end].to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_memory_cache_basic() {
        let cache = MemoryCache::new();

        assert_ok!(cache.set_with_ttl("sess:a", "{}", 3600).await);
        assert_eq!(cache.get("sess:a").await.unwrap(), Some("{}".to_string()));
        assert_eq!(cache.writes(), 1);

        assert_ok!(cache.delete("sess:a").await);
        assert_eq!(cache.get("sess:a").await.unwrap(), None);
        assert_ok!(cache.delete("sess:a").await);
    }

    #[tokio::test]
    async fn test_memory_cache_rejects_zero_ttl() {
        let cache = MemoryCache::new();
        let err = assert_err!(cache.set_with_ttl("k", "v", 0).await);
        assert!(matches!(err, CacheError::Command(_)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_memory_cache_expiry() {
        let cache = MemoryCache::new();
        cache.entries.write().insert(
            "old".to_string(),
            Entry {
                value: "{}".to_string(),
                expires_at: Instant::now(),
            },
        );

        assert_eq!(cache.get("old").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_memory_cache_offline() {
        let cache = MemoryCache::new();
        cache.set_offline(true);

        assert_err!(cache.ping().await);
        assert_err!(cache.get("k").await);
        assert_err!(cache.set_with_ttl("k", "v", 10).await);
        assert_eq!(cache.failed_calls(), 3);
        assert_eq!(cache.writes(), 0);

        cache.set_offline(false);
        assert_ok!(cache.ping().await);
    }

    #[tokio::test]
    async fn test_memory_cache_scan_pages() {
        let cache = MemoryCache::new();
        for i in 0..25 {
            cache
                .set_with_ttl(&format!("sess:{:02}", i), "{}", 60)
                .await
                .unwrap();
        }
        cache.set_with_ttl("other:1", "{}", 60).await.unwrap();

        let mut cursor = 0;
        let mut pages = 0;
        let mut seen = Vec::new();
        loop {
            let (next, keys) = cache.scan(cursor, "sess:*", 10).await.unwrap();
            seen.extend(keys);
            pages += 1;
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(seen.len(), 25);
        assert!(seen.iter().all(|k| k.starts_with("sess:")));
    }

    fn pattern_matches(pattern: &str, key: &str) -> bool {
        redis_pattern(pattern).unwrap().matches(key)
    }

    #[test]
    fn test_redis_pattern() {
        assert!(pattern_matches("*", ""));
        assert!(pattern_matches("*", "anything"));
        assert!(pattern_matches("sess:*", "sess:abc"));
        assert!(!pattern_matches("sess:*", "other:abc"));
        assert!(pattern_matches("a?c", "abc"));
        assert!(!pattern_matches("a?c", "ac"));
        assert!(!pattern_matches("abc", "abcd"));
    }

    #[test]
    fn test_redis_pattern_classes_and_escapes() {
        assert!(pattern_matches("sess[ab]:*", "sessa:x"));
        assert!(!pattern_matches("sess[ab]:*", "sessc:x"));
        assert!(pattern_matches("[^a]bc", "xbc"));
        assert!(!pattern_matches("[^a]bc", "abc"));
        assert!(pattern_matches("a\\*b", "a*b"));
        assert!(!pattern_matches("a\\*b", "axb"));
        assert!(pattern_matches("a\\?", "a?"));
        assert!(!pattern_matches("a\\?", "ab"));
    }

    #[tokio::test]
    async fn test_memory_cache_scan_invalid_pattern() {
        let cache = MemoryCache::new();
        let err = assert_err!(cache.scan(0, "sess[", 10).await);
        assert!(matches!(err, CacheError::Command(_)));
    }
}
