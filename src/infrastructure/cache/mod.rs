//! Cache Module
//!
//! Redis connection management, key naming, and the presence store.
//!
//! # Example
//!
//! ```rust,ignore
//! use chatroom_server::infrastructure::cache::{create_redis_client, RedisPresenceStore};
//!
//! let conn = create_redis_client("redis://localhost:6379").await?;
//! let presence = RedisPresenceStore::new(conn, Duration::from_secs(120));
//! presence.mark_online(42).await?;
//! ```

mod presence_cache;

pub use presence_cache::{LocalPresenceStore, PresenceRecord, RedisPresenceStore};

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::domain::RepositoryError;

/// Creates a Redis connection manager with automatic reconnection.
///
/// The connection manager multiplexes one connection and reconnects when
/// it is lost.
#[instrument(skip(url))]
pub async fn create_redis_client(url: &str) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// PING the server; used by the readiness probe.
pub async fn ping(redis: &ConnectionManager) -> Result<(), redis::RedisError> {
    let mut conn = redis.clone();
    redis::cmd("PING").query_async::<String>(&mut conn).await.map(|_| ())
}

impl From<redis::RedisError> for RepositoryError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_timeout() {
            RepositoryError::Timeout
        } else {
            RepositoryError::Unavailable(e.to_string())
        }
    }
}

/// Cache key prefixes for different data types.
pub mod keys {
    /// Prefix for user presence/online status (e.g., "presence:user_id")
    pub const USER_PRESENCE: &str = "presence:";

    /// Generates a presence key for a user
    #[inline]
    pub fn presence(user_id: impl std::fmt::Display) -> String {
        format!("{}{}", USER_PRESENCE, user_id)
    }
}
