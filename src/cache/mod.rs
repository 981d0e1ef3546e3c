//! Cache client implementations

mod memory;
mod traits;

pub use memory::MemoryCache;
pub use traits::CacheClient;

#[cfg(feature = "redis-store")]
mod redis_cache;

#[cfg(feature = "redis-store")]
pub use redis_cache::RedisCache;
