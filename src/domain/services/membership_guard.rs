//! Membership domain service.
//!
//! The single authority for "may user X act in room Y". Every message read
//! and write goes through [`MembershipGuard::require_membership`], and every
//! join through [`MembershipGuard::add_member`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::entities::{
    AppendOutcome, Chatroom, ChatroomMember, Identity, RoomId, RoomRepository, UserId,
};
use crate::domain::repository::{within_deadline, within_write_deadline, RepositoryError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("Chatroom not found")]
    RoomNotFound,

    #[error("User is already a member of this chatroom")]
    AlreadyMember,

    #[error("User is not a member of this chatroom")]
    NotMember,

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

/// Validates and mutates room membership.
pub struct MembershipGuard<R: RoomRepository + ?Sized> {
    rooms: Arc<R>,
    deadline: Duration,
}

impl<R: RoomRepository + ?Sized> Clone for MembershipGuard<R> {
    fn clone(&self) -> Self {
        Self {
            rooms: Arc::clone(&self.rooms),
            deadline: self.deadline,
        }
    }
}

impl<R: RoomRepository + ?Sized> MembershipGuard<R> {
    /// `deadline` bounds every repository call the guard makes.
    pub fn new(rooms: Arc<R>, deadline: Duration) -> Self {
        Self { rooms, deadline }
    }

    /// Load the room or fail with `RoomNotFound`.
    pub async fn ensure_room_exists(&self, room_id: RoomId) -> Result<Chatroom, GuardError> {
        within_deadline(self.deadline, self.rooms.find_by_id(room_id))
            .await?
            .ok_or(GuardError::RoomNotFound)
    }

    pub fn is_member(room: &Chatroom, user_id: UserId) -> bool {
        room.is_member(user_id)
    }

    /// Add the user to the room's member list.
    ///
    /// The append is conditional on the user's absence at write time, so of
    /// two racing joins for the same user exactly one succeeds.
    pub async fn add_member(
        &self,
        room_id: RoomId,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<Chatroom, GuardError> {
        let room = self.ensure_room_exists(room_id).await?;
        if Self::is_member(&room, identity.user_id) {
            return Err(GuardError::AlreadyMember);
        }

        let member = ChatroomMember::new(identity, now);
        match within_write_deadline(self.deadline, self.rooms.append_member(room_id, &member)).await? {
            AppendOutcome::Appended(room) => Ok(room),
            AppendOutcome::AlreadyPresent => Err(GuardError::AlreadyMember),
            AppendOutcome::NotFound => Err(GuardError::RoomNotFound),
        }
    }

    /// Load the room and check that the user belongs to it.
    pub async fn require_membership(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<Chatroom, GuardError> {
        let room = self.ensure_room_exists(room_id).await?;
        if !Self::is_member(&room, user_id) {
            return Err(GuardError::NotMember);
        }
        Ok(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::MockRoomRepository;
    use crate::infrastructure::repositories::InMemoryRoomRepository;

    const DEADLINE: Duration = Duration::from_secs(1);

    async fn guard_with_room() -> (MembershipGuard<InMemoryRoomRepository>, Chatroom) {
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let room = Chatroom::new(100, "general", &Identity::new(1, "alice"), Utc::now());
        rooms.insert(&room).await.unwrap();
        (MembershipGuard::new(rooms, DEADLINE), room)
    }

    #[tokio::test]
    async fn missing_room_is_not_found() {
        let (guard, _) = guard_with_room().await;

        assert_eq!(guard.ensure_room_exists(999).await, Err(GuardError::RoomNotFound));
        assert_eq!(guard.require_membership(999, 1).await, Err(GuardError::RoomNotFound));
        assert_eq!(
            guard.add_member(999, &Identity::new(2, "bob"), Utc::now()).await,
            Err(GuardError::RoomNotFound)
        );
    }

    #[tokio::test]
    async fn membership_is_required() {
        let (guard, room) = guard_with_room().await;

        assert!(guard.require_membership(room.id, 1).await.is_ok());
        assert_eq!(guard.require_membership(room.id, 2).await, Err(GuardError::NotMember));
    }

    #[tokio::test]
    async fn add_member_appends_once() {
        let (guard, room) = guard_with_room().await;
        let bob = Identity::new(2, "bob");

        let updated = guard.add_member(room.id, &bob, Utc::now()).await.unwrap();
        assert_eq!(updated.member_ids(), vec![1, 2]);
        assert_eq!(updated.members[1].username, "bob");

        assert_eq!(
            guard.add_member(room.id, &bob, Utc::now()).await,
            Err(GuardError::AlreadyMember)
        );
        assert!(guard.require_membership(room.id, 2).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_joins_yield_one_success() {
        let (guard, room) = guard_with_room().await;
        let bob = Identity::new(2, "bob");

        let (a, b) = tokio::join!(
            guard.add_member(room.id, &bob, Utc::now()),
            guard.add_member(room.id, &bob, Utc::now()),
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|r| matches!(r, Err(GuardError::AlreadyMember)))
                .count(),
            1
        );

        let stored = guard.ensure_room_exists(room.id).await.unwrap();
        assert_eq!(stored.members.iter().filter(|m| m.user_id == 2).count(), 1);
    }

    #[tokio::test]
    async fn lost_race_at_write_time_reports_already_member() {
        let room = Chatroom::new(5, "lobby", &Identity::new(1, "alice"), Utc::now());
        let mut rooms = MockRoomRepository::new();
        rooms
            .expect_find_by_id()
            .returning(move |_| Ok(Some(room.clone())));
        rooms
            .expect_append_member()
            .returning(|_, _| Ok(AppendOutcome::AlreadyPresent));

        let guard = MembershipGuard::new(Arc::new(rooms), DEADLINE);
        assert_eq!(
            guard.add_member(5, &Identity::new(2, "bob"), Utc::now()).await,
            Err(GuardError::AlreadyMember)
        );
    }

    #[tokio::test]
    async fn store_failures_propagate() {
        let mut rooms = MockRoomRepository::new();
        rooms
            .expect_find_by_id()
            .returning(|_| Err(RepositoryError::Unavailable("connection reset".into())));

        let guard = MembershipGuard::new(Arc::new(rooms), DEADLINE);
        assert!(matches!(
            guard.require_membership(1, 1).await,
            Err(GuardError::Store(RepositoryError::Unavailable(_)))
        ));
    }
}
