//! # redis-session-store
//!
//! Server-side session persistence in a shared key-value cache.
//!
//! The store issues unguessable session identifiers, keeps each session as a
//! JSON object under a cache key with an expiry, and keeps request handling
//! alive when the cache misbehaves: reads fall back to an empty session and
//! writes are best-effort.
//!
//! ## Features
//!
//! - **High-entropy identifiers**: 84-character URL-safe tokens from SHA-512 over OS randomness
//! - **Cache-side expiry**: every write carries a TTL (one week by default), so there is no
//!   garbage collection
//! - **Pluggable cache clients**: Redis, in-memory, or any [`CacheClient`] implementation
//! - **Explicit fault policy**: degrade (log, count, carry on) or propagate cache faults
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use redis_session_store::{RedisConfig, SessionConfig, SessionStore};
//!
//! #[tokio::main]
//! async fn main() -> redis_session_store::Result<()> {
//!     // Fails fast if Redis is unreachable
//!     let store = SessionStore::connect_redis(
//!         &RedisConfig::from_env()?,
//!         SessionConfig::default(),
//!     )
//!     .await?;
//!
//!     let mut session = store.read(cookie_value).await?;
//!     let views: i32 = session.get("views").unwrap_or(0);
//!     session.set("views", views + 1);
//!     store.save_session(&session).await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod id;
pub mod session;
pub mod store;

pub use cache::{CacheClient, MemoryCache};
pub use config::{FaultPolicy, KeyStrategy, RedisConfig, SessionConfig};
pub use error::{CacheError, Result, SessionError};
pub use id::{is_valid_session_id, IdentifierGenerator, SessionId, SESSION_ID_LEN};
pub use session::{Session, SessionRecord};
pub use store::SessionStore;

#[cfg(feature = "redis-store")]
pub use cache::RedisCache;
