//! In-process repository implementations.
//!
//! Used for the `memory` storage backend and in tests. Each store keeps its
//! data behind a single `parking_lot::RwLock`; conditional writes check and
//! mutate under the same write guard.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{
    AppendOutcome, Chatroom, ChatroomMember, Message, MessageId, MessageRepository,
    RepositoryError, RoomId, RoomRepository, ROOM_NAME_CONSTRAINT,
};

#[derive(Default)]
struct RoomTable {
    rooms: HashMap<RoomId, Chatroom>,
    by_name: HashMap<String, RoomId>,
    creation_order: Vec<RoomId>,
}

/// Chatroom storage held in process memory.
#[derive(Default)]
pub struct InMemoryRoomRepository {
    table: RwLock<RoomTable>,
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn find_by_id(&self, id: RoomId) -> Result<Option<Chatroom>, RepositoryError> {
        Ok(self.table.read().rooms.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Chatroom>, RepositoryError> {
        let table = self.table.read();
        Ok(table
            .by_name
            .get(name)
            .and_then(|id| table.rooms.get(id))
            .cloned())
    }

    async fn insert(&self, room: &Chatroom) -> Result<(), RepositoryError> {
        let mut table = self.table.write();
        if table.by_name.contains_key(&room.name) {
            return Err(RepositoryError::DuplicateKey(ROOM_NAME_CONSTRAINT.into()));
        }
        if table.rooms.contains_key(&room.id) {
            return Err(RepositoryError::DuplicateKey("chatrooms_pkey".into()));
        }

        table.by_name.insert(room.name.clone(), room.id);
        table.creation_order.push(room.id);
        table.rooms.insert(room.id, room.clone());
        Ok(())
    }

    async fn append_member(
        &self,
        id: RoomId,
        member: &ChatroomMember,
    ) -> Result<AppendOutcome, RepositoryError> {
        let mut table = self.table.write();
        let Some(room) = table.rooms.get_mut(&id) else {
            return Ok(AppendOutcome::NotFound);
        };
        if room.is_member(member.user_id) {
            return Ok(AppendOutcome::AlreadyPresent);
        }

        room.members.push(member.clone());
        Ok(AppendOutcome::Appended(room.clone()))
    }

    async fn list_all(&self) -> Result<Vec<Chatroom>, RepositoryError> {
        let table = self.table.read();
        Ok(table
            .creation_order
            .iter()
            .filter_map(|id| table.rooms.get(id).cloned())
            .collect())
    }
}

/// One room's messages, kept in ascending `(sent_at, id)` order.
#[derive(Default)]
struct RoomHistory {
    ids: HashSet<MessageId>,
    messages: Vec<Message>,
}

/// Message history held in process memory.
#[derive(Default)]
pub struct InMemoryMessageRepository {
    by_room: RwLock<HashMap<RoomId, RoomHistory>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn insert(&self, message: &Message) -> Result<(), RepositoryError> {
        let mut by_room = self.by_room.write();
        let history = by_room.entry(message.chatroom_id).or_default();
        if !history.ids.insert(message.id) {
            return Err(RepositoryError::DuplicateKey("messages_pkey".into()));
        }

        // Sends are sequenced per room, so this is almost always the end.
        let key = (message.sent_at, message.id);
        let position = history
            .messages
            .iter()
            .rposition(|m| (m.sent_at, m.id) < key)
            .map_or(0, |i| i + 1);
        history.messages.insert(position, message.clone());
        Ok(())
    }

    async fn list_by_room(
        &self,
        room_id: RoomId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError> {
        let by_room = self.by_room.read();
        Ok(by_room
            .get(&room_id)
            .map(|history| history.messages.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Identity, MessagePayload};
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    fn message(id: i64, room: RoomId, offset_ms: i64) -> Message {
        let base = Utc::now();
        Message::new(
            id,
            room,
            &Identity::new(1, "alice"),
            MessagePayload::parse("text", Some(format!("m{id}")), None).unwrap(),
            base + Duration::milliseconds(offset_ms),
        )
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let repo = InMemoryRoomRepository::new();
        let alice = Identity::new(1, "alice");
        repo.insert(&Chatroom::new(1, "general", &alice, Utc::now())).await.unwrap();

        let err = repo
            .insert(&Chatroom::new(2, "general", &alice, Utc::now()))
            .await
            .unwrap_err();
        assert_eq!(err, RepositoryError::DuplicateKey("chatrooms_name_key".into()));

        // Names are case-sensitive
        repo.insert(&Chatroom::new(3, "General", &alice, Utc::now())).await.unwrap();
        let names: Vec<_> = repo.list_all().await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["general", "General"]);
    }

    #[tokio::test]
    async fn append_member_outcomes() {
        let repo = InMemoryRoomRepository::new();
        let alice = Identity::new(1, "alice");
        repo.insert(&Chatroom::new(1, "general", &alice, Utc::now())).await.unwrap();
        let bob = ChatroomMember::new(&Identity::new(2, "bob"), Utc::now());

        assert!(matches!(
            repo.append_member(1, &bob).await.unwrap(),
            AppendOutcome::Appended(room) if room.member_ids() == vec![1, 2]
        ));
        assert_eq!(repo.append_member(1, &bob).await.unwrap(), AppendOutcome::AlreadyPresent);
        assert_eq!(repo.append_member(9, &bob).await.unwrap(), AppendOutcome::NotFound);
    }

    #[tokio::test]
    async fn history_is_newest_first_with_id_tiebreak() {
        let repo = InMemoryMessageRepository::new();
        let same_instant = message(10, 1, 5);
        let mut tied = same_instant.clone();
        tied.id = 11;

        repo.insert(&message(1, 1, 0)).await.unwrap();
        repo.insert(&same_instant).await.unwrap();
        repo.insert(&tied).await.unwrap();
        repo.insert(&message(20, 2, 50)).await.unwrap();

        let ids: Vec<_> = repo.list_by_room(1, 10).await.unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![11, 10, 1]);

        let ids: Vec<_> = repo.list_by_room(1, 2).await.unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![11, 10]);

        assert!(repo.list_by_room(3, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn late_insert_lands_in_stamp_order() {
        let repo = InMemoryMessageRepository::new();
        let earliest = message(1, 1, -100);
        let latest = message(3, 1, 100);
        let middle = message(2, 1, 0);

        repo.insert(&earliest).await.unwrap();
        repo.insert(&latest).await.unwrap();
        repo.insert(&middle).await.unwrap();

        let ids: Vec<_> = repo.list_by_room(1, 10).await.unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        assert_eq!(
            repo.insert(&middle).await.unwrap_err(),
            RepositoryError::DuplicateKey("messages_pkey".into())
        );
    }
}
