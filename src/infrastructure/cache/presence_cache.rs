//! Presence Store Implementations
//!
//! Redis-backed presence with a TTL refreshed by gateway heartbeats, and a
//! process-local fallback with the same expiry semantics.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use super::keys;
use crate::domain::{PresenceStore, RepositoryError, UserId, UserStatus};

/// Value stored under `presence:{user_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub user_id: UserId,
    pub status: UserStatus,
    pub last_seen: i64,
}

/// Presence store backed by Redis keys with expiry.
#[derive(Clone)]
pub struct RedisPresenceStore {
    redis: ConnectionManager,
    ttl: Duration,
}

impl RedisPresenceStore {
    pub fn new(redis: ConnectionManager, ttl: Duration) -> Self {
        Self { redis, ttl }
    }
}

#[async_trait]
impl PresenceStore for RedisPresenceStore {
    async fn mark_online(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let record = PresenceRecord {
            user_id,
            status: UserStatus::Online,
            last_seen: Utc::now().timestamp(),
        };
        let value = serde_json::to_string(&record)
            .map_err(|e| RepositoryError::Corrupt(format!("Serialization error: {}", e)))?;

        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(keys::presence(user_id), value, self.ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn mark_offline(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let mut conn = self.redis.clone();
        conn.del::<_, i64>(keys::presence(user_id)).await?;
        Ok(())
    }

    async fn status(&self, user_id: UserId) -> Result<UserStatus, RepositoryError> {
        let mut conn = self.redis.clone();
        let value: Option<String> = conn.get(keys::presence(user_id)).await?;

        Ok(value
            .and_then(|json| serde_json::from_str::<PresenceRecord>(&json).ok())
            .map(|record| record.status)
            .unwrap_or(UserStatus::Offline))
    }
}

/// Presence held in process memory.
pub struct LocalPresenceStore {
    online_until: DashMap<UserId, Instant>,
    ttl: Duration,
}

impl LocalPresenceStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            online_until: DashMap::new(),
            ttl,
        }
    }
}

#[async_trait]
impl PresenceStore for LocalPresenceStore {
    async fn mark_online(&self, user_id: UserId) -> Result<(), RepositoryError> {
        self.online_until.insert(user_id, Instant::now() + self.ttl);
        Ok(())
    }

    async fn mark_offline(&self, user_id: UserId) -> Result<(), RepositoryError> {
        self.online_until.remove(&user_id);
        Ok(())
    }

    async fn status(&self, user_id: UserId) -> Result<UserStatus, RepositoryError> {
        let online = self
            .online_until
            .get(&user_id)
            .is_some_and(|deadline| *deadline > Instant::now());

        Ok(if online {
            UserStatus::Online
        } else {
            UserStatus::Offline
        })
    }
}
