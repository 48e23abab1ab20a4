//! Chatroom Repository Implementation
//!
//! PostgreSQL implementation of room storage. Members live in a JSONB array
//! on the room row; joins are a single conditional `UPDATE`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::{AppendOutcome, Chatroom, ChatroomMember, RepositoryError, RoomId, RoomRepository};
use crate::infrastructure::database::{user_id_from_db, user_id_to_db};

/// PostgreSQL chatroom repository implementation.
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    /// Creates a new PgRoomRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for chatroom queries.
#[derive(Debug, sqlx::FromRow)]
struct ChatroomRow {
    id: i64,
    name: String,
    created_by: i64,
    created_at: DateTime<Utc>,
    members: Json<Vec<ChatroomMember>>,
}

impl ChatroomRow {
    fn into_chatroom(self) -> Result<Chatroom, RepositoryError> {
        Ok(Chatroom {
            id: self.id,
            name: self.name,
            created_by: user_id_from_db(self.created_by)?,
            created_at: self.created_at,
            members: self.members.0,
        })
    }
}

const SELECT_COLUMNS: &str = "id, name, created_by, created_at, members";

#[async_trait]
impl RoomRepository for PgRoomRepository {
    async fn find_by_id(&self, id: RoomId) -> Result<Option<Chatroom>, RepositoryError> {
        let row = sqlx::query_as::<_, ChatroomRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM chatrooms WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ChatroomRow::into_chatroom).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Chatroom>, RepositoryError> {
        let row = sqlx::query_as::<_, ChatroomRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM chatrooms WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ChatroomRow::into_chatroom).transpose()
    }

    /// Insert a room. The unique index on `name` turns a concurrent
    /// duplicate into `DuplicateKey`.
    async fn insert(&self, room: &Chatroom) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO chatrooms (id, name, created_by, created_at, members)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(room.id)
        .bind(&room.name)
        .bind(user_id_to_db(room.created_by)?)
        .bind(room.created_at)
        .bind(Json(&room.members))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Conditionally append a member.
    ///
    /// The `WHERE NOT members @> ...` predicate is re-evaluated after the row
    /// lock is taken, so concurrent joins for one user serialize and only the
    /// first one updates the row.
    async fn append_member(
        &self,
        id: RoomId,
        member: &ChatroomMember,
    ) -> Result<AppendOutcome, RepositoryError> {
        let user_id = user_id_to_db(member.user_id)?;

        let row = sqlx::query_as::<_, ChatroomRow>(&format!(
            r#"
            UPDATE chatrooms
            SET members = members || $2
            WHERE id = $1
              AND NOT members @> jsonb_build_array(jsonb_build_object('user_id', $3::bigint))
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(Json(vec![member]))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(AppendOutcome::Appended(row.into_chatroom()?));
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM chatrooms WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(if exists {
            AppendOutcome::AlreadyPresent
        } else {
            AppendOutcome::NotFound
        })
    }

    async fn list_all(&self) -> Result<Vec<Chatroom>, RepositoryError> {
        let rows = sqlx::query_as::<_, ChatroomRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM chatrooms ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ChatroomRow::into_chatroom).collect()
    }
}
