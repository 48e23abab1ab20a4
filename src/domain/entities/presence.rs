//! User presence flag and its store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::identity::UserId;
use crate::domain::repository::RepositoryError;

/// The single status flag tracked per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Offline,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

/// Stores who is currently connected to the realtime gateway.
///
/// Online entries expire unless refreshed, so a crashed process does not
/// leave users online forever.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Mark the user online, (re)starting the expiry window.
    async fn mark_online(&self, user_id: UserId) -> Result<(), RepositoryError>;

    async fn mark_offline(&self, user_id: UserId) -> Result<(), RepositoryError>;

    async fn status(&self, user_id: UserId) -> Result<UserStatus, RepositoryError>;
}
