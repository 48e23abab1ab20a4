//! Message entity, payload rules and repository trait.
//!
//! Maps to the `messages` table in the database schema.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::chatroom::RoomId;
use super::identity::{Identity, UserId};
use crate::domain::repository::RepositoryError;

/// Snowflake ID of a message.
pub type MessageId = i64;

/// Maximum text length in characters.
pub const MAX_TEXT_CHARS: usize = 4000;

/// Maximum media URL length in characters.
pub const MAX_MEDIA_URL_CHARS: usize = 2048;

/// Closed set of message kinds.
///
/// Database definition:
/// ```sql
/// message_type VARCHAR(32) NOT NULL CHECK (message_type IN (
///     'text', 'picture', 'audio', 'video',
///     'text_and_picture', 'text_and_audio', 'text_and_video'
/// ))
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Picture,
    Audio,
    Video,
    TextAndPicture,
    TextAndAudio,
    TextAndVideo,
}

impl MessageType {
    pub const ALL: [MessageType; 7] = [
        Self::Text,
        Self::Picture,
        Self::Audio,
        Self::Video,
        Self::TextAndPicture,
        Self::TextAndAudio,
        Self::TextAndVideo,
    ];

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Picture => "picture",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::TextAndPicture => "text_and_picture",
            Self::TextAndAudio => "text_and_audio",
            Self::TextAndVideo => "text_and_video",
        }
    }

    /// Whether messages of this type carry text.
    pub fn carries_text(&self) -> bool {
        !matches!(self, Self::Picture | Self::Audio | Self::Video)
    }

    /// Whether messages of this type carry a media URL.
    pub fn carries_media(&self) -> bool {
        !matches!(self, Self::Text)
    }
}

impl FromStr for MessageType {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| PayloadError::UnknownType(s.to_string()))
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Violation of the type/payload pairing rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("Unknown message type '{0}'")]
    UnknownType(String),

    #[error("Message type '{0}' requires text content")]
    MissingText(MessageType),

    #[error("Message type '{0}' requires a media URL")]
    MissingMedia(MessageType),

    #[error("Message type '{0}' does not accept text content")]
    UnexpectedText(MessageType),

    #[error("Message type '{0}' does not accept a media URL")]
    UnexpectedMedia(MessageType),

    #[error("Text content exceeds {MAX_TEXT_CHARS} characters")]
    TextTooLong,

    #[error("Media URL exceeds {MAX_MEDIA_URL_CHARS} characters")]
    MediaUrlTooLong,
}

/// A validated message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePayload {
    message_type: MessageType,
    text_content: Option<String>,
    media_url: Option<String>,
}

impl MessagePayload {
    /// Validate a raw type tag and optional fields.
    ///
    /// Empty strings count as absent and whitespace-only text counts as
    /// missing. Text-bearing types require text, media-bearing types require
    /// a URL, and a field the type does not carry must be absent.
    pub fn parse(
        message_type: &str,
        text_content: Option<String>,
        media_url: Option<String>,
    ) -> Result<Self, PayloadError> {
        let message_type: MessageType = message_type.parse()?;
        let text_content = text_content.filter(|t| !t.trim().is_empty());
        let media_url = media_url.filter(|u| !u.trim().is_empty());

        match (&text_content, message_type.carries_text()) {
            (None, true) => return Err(PayloadError::MissingText(message_type)),
            (Some(_), false) => return Err(PayloadError::UnexpectedText(message_type)),
            (Some(text), true) if text.chars().count() > MAX_TEXT_CHARS => {
                return Err(PayloadError::TextTooLong)
            }
            _ => {}
        }

        match (&media_url, message_type.carries_media()) {
            (None, true) => return Err(PayloadError::MissingMedia(message_type)),
            (Some(_), false) => return Err(PayloadError::UnexpectedMedia(message_type)),
            (Some(url), true) if url.chars().count() > MAX_MEDIA_URL_CHARS => {
                return Err(PayloadError::MediaUrlTooLong)
            }
            _ => {}
        }

        Ok(Self {
            message_type,
            text_content,
            media_url,
        })
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }
}

/// Represents a message in a chatroom. Immutable once stored.
///
/// Maps to the `messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - chatroom_id: BIGINT NOT NULL REFERENCES chatrooms(id)
/// - sender_id: BIGINT NOT NULL
/// - sender_name: TEXT NOT NULL
/// - message_type: VARCHAR(32) NOT NULL
/// - text_content: TEXT NULL
/// - media_url: TEXT NULL
/// - sent_at: TIMESTAMPTZ NOT NULL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Snowflake ID (primary key, tie-breaker for equal `sent_at`)
    pub id: MessageId,

    /// Room the message belongs to
    pub chatroom_id: RoomId,

    /// Sender identity captured at send time
    pub sender_id: UserId,
    pub sender_name: String,

    pub message_type: MessageType,
    pub text_content: Option<String>,
    pub media_url: Option<String>,

    /// Assigned by the service at persist time
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        id: MessageId,
        chatroom_id: RoomId,
        sender: &Identity,
        payload: MessagePayload,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            chatroom_id,
            sender_id: sender.user_id,
            sender_name: sender.username.clone(),
            message_type: payload.message_type,
            text_content: payload.text_content,
            media_url: payload.media_url,
            sent_at,
        }
    }
}

/// Repository trait for Message data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Append a message.
    async fn insert(&self, message: &Message) -> Result<(), RepositoryError>;

    /// Up to `limit` messages of a room, newest first. Equal `sent_at`
    /// values are ordered by descending id.
    async fn list_by_room(&self, room_id: RoomId, limit: usize)
        -> Result<Vec<Message>, RepositoryError>;
}
