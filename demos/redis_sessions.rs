//! Redis session store walkthrough
//!
//! Needs a reachable Redis server. Connection options come from the
//! environment:
//!
//! ```sh
//! REDIS_HOST=127.0.0.1 REDIS_PORT=6379 REDIS_DB_NUM=0 \
//!     RUST_LOG=redis_session_store=debug cargo run --example redis_sessions
//! ```

use redis_session_store::{RedisConfig, SessionConfig, SessionStore};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let redis = RedisConfig::from_env()?
        .with_connection_timeout(Duration::from_secs(2))
        .with_response_timeout(Duration::from_secs(1));
    let config = SessionConfig::default().with_ttl(Duration::from_secs(600));

    // Fails here, and only here, if Redis is down
    let store = SessionStore::connect_redis(&redis, config).await?;

    // First request: no cookie yet
    let mut session = store.create()?;
    session.set("user", "alice");
    session.set("cart", vec!["sku-1", "sku-2"]);
    store.save_session(&session).await?;
    let cookie = session.id().to_string();
    println!("Issued session {}…", &cookie[..8]);

    // Next request: cookie comes back
    let mut session = store.read(&cookie).await?;
    let views: u32 = session.get("views").unwrap_or(0);
    session.set("views", views + 1);
    store.save_session(&session).await?;
    println!("Loaded user {:?}", session.get::<String>("user"));

    // A tampered cookie gets a fresh, empty session
    let fresh = store.read("not-a-real-session-id").await?;
    println!("Tampered cookie -> new session, empty: {}", fresh.record().is_empty());

    // Login: move the record to a new identifier
    let rotated = store.rotate(session).await?;
    store.save_session(&rotated).await?;

    println!("Keys in namespace: {}", store.list().await?.len());

    store.delete(rotated.id().as_str()).await?;
    Ok(())
}
