//! Messaging Service
//!
//! Room creation, listing and joining; message sending and history reads.
//! Every message operation passes the membership guard first.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use tracing::instrument;

use super::room_sequencer::RoomSequencer;
use crate::domain::services::{GuardError, MembershipGuard};
use crate::domain::{
    within_deadline, within_write_deadline, Chatroom, ChatroomMember, Identity, Message,
    MessagePayload, MessageRepository, PayloadError, RepositoryError, RoomId, RoomRepository,
    UserId, ROOM_NAME_CONSTRAINT,
};
use crate::shared::snowflake::SnowflakeGenerator;

/// Receives persisted messages and joins for live fan-out.
///
/// Implementations contain their own failures; nothing raised while
/// delivering can reach the sender.
pub trait DeliveryNotifier: Send + Sync {
    fn message_created(&self, message: &Message, member_ids: &[UserId]);

    fn member_joined(&self, room: &Chatroom, member: &ChatroomMember);
}

/// Messaging service trait
#[async_trait]
pub trait MessagingService: Send + Sync {
    /// Create a room with the caller as its first member
    async fn create_room(&self, creator: &Identity, name: &str) -> Result<Chatroom, MessagingError>;

    /// All rooms, oldest first
    async fn list_rooms(&self) -> Result<Vec<Chatroom>, MessagingError>;

    /// Add the caller to a room
    async fn join_room(&self, room_id: RoomId, user: &Identity) -> Result<Chatroom, MessagingError>;

    /// Persist a message from a room member and push it to connected members
    async fn send_message(
        &self,
        room_id: RoomId,
        sender: &Identity,
        request: SendMessageDto,
    ) -> Result<Message, MessagingError>;

    /// Newest messages of a room, newest first
    async fn list_messages(
        &self,
        room_id: RoomId,
        caller: UserId,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, MessagingError>;
}

/// Send message request
#[derive(Debug, Clone)]
pub struct SendMessageDto {
    pub message_type: String,
    pub text_content: Option<String>,
    pub media_url: Option<String>,
}

/// Messaging service errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessagingError {
    #[error("{0}")]
    Validation(String),

    #[error("Chatroom not found")]
    RoomNotFound,

    #[error("User is already a member of this chatroom")]
    AlreadyMember,

    #[error("Chatroom name already exists")]
    DuplicateName,

    #[error("User is not a member of this chatroom")]
    NotMember,

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage operation timed out")]
    Timeout,

    /// The store never answered a write; it may have been applied.
    #[error("Storage write outcome unknown")]
    OutcomeUnknown,
}

impl MessagingError {
    /// Transient store failures where nothing was written; the same call may
    /// succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }
}

impl From<RepositoryError> for MessagingError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Timeout => MessagingError::Timeout,
            RepositoryError::OutcomeUnknown => MessagingError::OutcomeUnknown,
            other => MessagingError::Unavailable(other.to_string()),
        }
    }
}

impl From<GuardError> for MessagingError {
    fn from(e: GuardError) -> Self {
        match e {
            GuardError::RoomNotFound => MessagingError::RoomNotFound,
            GuardError::AlreadyMember => MessagingError::AlreadyMember,
            GuardError::NotMember => MessagingError::NotMember,
            GuardError::Store(e) => e.into(),
        }
    }
}

impl From<PayloadError> for MessagingError {
    fn from(e: PayloadError) -> Self {
        MessagingError::Validation(e.to_string())
    }
}

/// Paging and deadline knobs.
#[derive(Debug, Clone, Copy)]
pub struct MessagingLimits {
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub store_timeout: Duration,
}

impl MessagingLimits {
    /// Absent or non-positive limits fall back to the default page size;
    /// larger ones are capped.
    pub fn page_size(&self, requested: Option<i64>) -> usize {
        match requested {
            Some(n) if n > 0 => (n as u64).min(self.max_page_size as u64) as usize,
            _ => self.default_page_size,
        }
    }
}

impl Default for MessagingLimits {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 500,
            store_timeout: Duration::from_secs(5),
        }
    }
}

/// MessagingService implementation
pub struct MessagingServiceImpl<R, M>
where
    R: RoomRepository + ?Sized,
    M: MessageRepository + ?Sized,
{
    room_repo: Arc<R>,
    message_repo: Arc<M>,
    guard: MembershipGuard<R>,
    sequencer: RoomSequencer,
    notifier: Arc<dyn DeliveryNotifier>,
    id_generator: Arc<SnowflakeGenerator>,
    limits: MessagingLimits,
}

impl<R, M> MessagingServiceImpl<R, M>
where
    R: RoomRepository + ?Sized,
    M: MessageRepository + ?Sized,
{
    pub fn new(
        room_repo: Arc<R>,
        message_repo: Arc<M>,
        notifier: Arc<dyn DeliveryNotifier>,
        id_generator: Arc<SnowflakeGenerator>,
        limits: MessagingLimits,
    ) -> Self {
        Self {
            guard: MembershipGuard::new(Arc::clone(&room_repo), limits.store_timeout),
            room_repo,
            message_repo,
            sequencer: RoomSequencer::new(),
            notifier,
            id_generator,
            limits,
        }
    }
}

#[async_trait]
impl<R, M> MessagingService for MessagingServiceImpl<R, M>
where
    R: RoomRepository + ?Sized + 'static,
    M: MessageRepository + ?Sized + 'static,
{
    #[instrument(skip(self, creator), fields(creator_id = creator.user_id))]
    async fn create_room(&self, creator: &Identity, name: &str) -> Result<Chatroom, MessagingError> {
        Chatroom::validate_name(name).map_err(MessagingError::Validation)?;

        let deadline = self.limits.store_timeout;
        if within_deadline(deadline, self.room_repo.find_by_name(name))
            .await?
            .is_some()
        {
            return Err(MessagingError::DuplicateName);
        }

        let room = Chatroom::new(
            self.id_generator.generate(),
            name,
            creator,
            Utc::now().trunc_subsecs(6),
        );

        // The store's uniqueness check is authoritative; the lookup above
        // only short-circuits the common case.
        match within_write_deadline(deadline, self.room_repo.insert(&room)).await {
            Ok(()) => {}
            Err(RepositoryError::DuplicateKey(key)) if key == ROOM_NAME_CONSTRAINT => {
                return Err(MessagingError::DuplicateName)
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(room_id = room.id, name = %room.name, "Chatroom created");
        Ok(room)
    }

    async fn list_rooms(&self) -> Result<Vec<Chatroom>, MessagingError> {
        Ok(within_deadline(self.limits.store_timeout, self.room_repo.list_all()).await?)
    }

    #[instrument(skip(self, user), fields(user_id = user.user_id))]
    async fn join_room(&self, room_id: RoomId, user: &Identity) -> Result<Chatroom, MessagingError> {
        let room = self
            .guard
            .add_member(room_id, user, Utc::now().trunc_subsecs(6))
            .await?;

        if let Some(member) = room.members.iter().find(|m| m.user_id == user.user_id) {
            self.notifier.member_joined(&room, member);
        }

        tracing::info!(room_id, members = room.members.len(), "User joined chatroom");
        Ok(room)
    }

    #[instrument(skip(self, sender, request), fields(sender_id = sender.user_id))]
    async fn send_message(
        &self,
        room_id: RoomId,
        sender: &Identity,
        request: SendMessageDto,
    ) -> Result<Message, MessagingError> {
        let room = self.guard.require_membership(room_id, sender.user_id).await?;
        let payload =
            MessagePayload::parse(&request.message_type, request.text_content, request.media_url)?;

        let mut clock = self.sequencer.acquire(room_id).await;
        let message = Message::new(
            self.id_generator.generate(),
            room.id,
            sender,
            payload,
            clock.stamp(Utc::now()),
        );

        match within_write_deadline(self.limits.store_timeout, self.message_repo.insert(&message))
            .await
        {
            Ok(()) => clock.commit(message.sent_at),
            Err(RepositoryError::OutcomeUnknown) => {
                // Later stamps must not precede a message that may be stored.
                clock.commit(message.sent_at);
                tracing::error!(message_id = message.id, room_id, "Message write outcome unknown");
                return Err(MessagingError::OutcomeUnknown);
            }
            Err(e) => return Err(e.into()),
        }

        self.notifier.message_created(&message, &room.member_ids());
        drop(clock);

        tracing::debug!(message_id = message.id, "Message persisted");
        Ok(message)
    }

    async fn list_messages(
        &self,
        room_id: RoomId,
        caller: UserId,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, MessagingError> {
        self.guard.require_membership(room_id, caller).await?;

        let limit = self.limits.page_size(limit);
        let messages = within_deadline(
            self.limits.store_timeout,
            self.message_repo.list_by_room(room_id, limit),
        )
        .await?;

        tracing::debug!(room_id, limit, returned = messages.len(), "Listed messages");
        Ok(messages)
    }
}
