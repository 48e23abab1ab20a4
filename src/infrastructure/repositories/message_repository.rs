//! Message Repository Implementation
//!
//! PostgreSQL implementation of the append-only message history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Message, MessageRepository, MessageType, RepositoryError, RoomId};
use crate::infrastructure::database::{user_id_from_db, user_id_to_db};

/// PostgreSQL message repository implementation.
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Creates a new PgMessageRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for message queries.
/// Maps to the messages table schema defined in the migration.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    chatroom_id: i64,
    sender_id: i64,
    sender_name: String,
    message_type: String,
    text_content: Option<String>,
    media_url: Option<String>,
    sent_at: DateTime<Utc>,
}

impl MessageRow {
    /// Converts database row to domain Message entity.
    fn into_message(self) -> Result<Message, RepositoryError> {
        let message_type: MessageType = self
            .message_type
            .parse()
            .map_err(|e: crate::domain::PayloadError| RepositoryError::Corrupt(e.to_string()))?;

        Ok(Message {
            id: self.id,
            chatroom_id: self.chatroom_id,
            sender_id: user_id_from_db(self.sender_id)?,
            sender_name: self.sender_name,
            message_type,
            text_content: self.text_content,
            media_url: self.media_url,
            sent_at: self.sent_at,
        })
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn insert(&self, message: &Message) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO messages (
                id, chatroom_id, sender_id, sender_name,
                message_type, text_content, media_url, sent_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(message.id)
        .bind(message.chatroom_id)
        .bind(user_id_to_db(message.sender_id)?)
        .bind(&message.sender_name)
        .bind(message.message_type.as_str())
        .bind(&message.text_content)
        .bind(&message.media_url)
        .bind(message.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Newest first, served by the `(chatroom_id, sent_at DESC, id DESC)` index.
    async fn list_by_room(
        &self,
        room_id: RoomId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, chatroom_id, sender_id, sender_name,
                   message_type, text_content, media_url, sent_at
            FROM messages
            WHERE chatroom_id = $1
            ORDER BY sent_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(room_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MessageRow::into_message).collect()
    }
}
