//! Chatroom entity and repository trait.
//!
//! Maps to the `chatrooms` table. The member list is embedded in the room
//! record as a JSONB array; there is no separate membership table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::{Identity, UserId};
use crate::domain::repository::RepositoryError;

/// Snowflake ID of a chatroom.
pub type RoomId = i64;

/// Minimum room name length in characters.
pub const ROOM_NAME_MIN_CHARS: usize = 3;

/// Maximum room name length in characters.
pub const ROOM_NAME_MAX_CHARS: usize = 100;

/// Unique index on `chatrooms.name`. Stores report a taken name as
/// `DuplicateKey` carrying this constraint.
pub const ROOM_NAME_CONSTRAINT: &str = "chatrooms_name_key";

/// One entry of a room's member list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatroomMember {
    pub user_id: UserId,
    pub username: String,
    pub joined_at: DateTime<Utc>,
}

impl ChatroomMember {
    pub fn new(identity: &Identity, joined_at: DateTime<Utc>) -> Self {
        Self {
            user_id: identity.user_id,
            username: identity.username.clone(),
            joined_at,
        }
    }
}

/// A named chatroom with its member list.
///
/// Maps to the `chatrooms` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - name: VARCHAR(100) NOT NULL UNIQUE
/// - created_by: BIGINT NOT NULL
/// - created_at: TIMESTAMPTZ NOT NULL
/// - members: JSONB NOT NULL (array of members, unique by user_id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chatroom {
    /// Snowflake ID (primary key)
    pub id: RoomId,

    /// Unique, case-sensitive room name (3-100 characters)
    pub name: String,

    /// User who created the room
    pub created_by: UserId,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Members in join order; the creator is always first
    pub members: Vec<ChatroomMember>,
}

impl Chatroom {
    /// Create a room whose only member is its creator.
    pub fn new(id: RoomId, name: impl Into<String>, creator: &Identity, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            created_by: creator.user_id,
            created_at: now,
            members: vec![ChatroomMember::new(creator, now)],
        }
    }

    /// Check a candidate room name against the length rule.
    pub fn validate_name(name: &str) -> Result<(), String> {
        let len = name.chars().count();
        if !(ROOM_NAME_MIN_CHARS..=ROOM_NAME_MAX_CHARS).contains(&len) {
            return Err(format!(
                "Chatroom name must be between {} and {} characters",
                ROOM_NAME_MIN_CHARS, ROOM_NAME_MAX_CHARS
            ));
        }
        Ok(())
    }

    /// Check if the user appears in the member list.
    pub fn is_member(&self, user_id: UserId) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    /// IDs of all members, in join order.
    pub fn member_ids(&self) -> Vec<UserId> {
        self.members.iter().map(|m| m.user_id).collect()
    }
}

/// Result of a conditional member append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The member was added; carries the room as stored after the write.
    Appended(Chatroom),
    /// The user was already in the member list; nothing was written.
    AlreadyPresent,
    /// No room with that id exists.
    NotFound,
}

/// Repository trait for Chatroom data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Find a room by its Snowflake ID.
    async fn find_by_id(&self, id: RoomId) -> Result<Option<Chatroom>, RepositoryError>;

    /// Find a room by its exact name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Chatroom>, RepositoryError>;

    /// Insert a new room. Fails with `DuplicateKey(ROOM_NAME_CONSTRAINT)`
    /// when the name is taken.
    async fn insert(&self, room: &Chatroom) -> Result<(), RepositoryError>;

    /// Append `member` unless a member with the same user id is already
    /// present. The presence check and the write are a single atomic step.
    async fn append_member(
        &self,
        id: RoomId,
        member: &ChatroomMember,
    ) -> Result<AppendOutcome, RepositoryError>;

    /// All rooms in creation order.
    async fn list_all(&self) -> Result<Vec<Chatroom>, RepositoryError>;
}
