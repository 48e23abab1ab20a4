//! # Domain Entities
//!
//! Core domain entities of the chatroom backend.
//!
//! ## Core Entities
//!
//! - **Chatroom**: A named room with its embedded member list
//! - **Message**: An immutable text or media message posted to a room
//! - **Identity**: The verified caller behind a request
//!
//! ## Supporting Entities
//!
//! - **Presence**: Online/offline flag per user
//! - **Activity**: Audit records handed to the activity sink
//!
//! ## Repository Traits
//!
//! Storage contracts are declared next to the entity they store and are
//! implemented in the infrastructure layer.

mod activity;
mod chatroom;
mod identity;
mod message;
mod presence;

pub use activity::{Activity, ActivityKind, ActivitySink, ClientMetadata};
pub use chatroom::{
    AppendOutcome, Chatroom, ChatroomMember, RoomId, RoomRepository, ROOM_NAME_CONSTRAINT,
    ROOM_NAME_MAX_CHARS, ROOM_NAME_MIN_CHARS,
};
pub use identity::{Identity, IdentityError, IdentityProvider, UserId};
pub use message::{
    Message, MessageId, MessagePayload, MessageRepository, MessageType, PayloadError,
    MAX_MEDIA_URL_CHARS, MAX_TEXT_CHARS,
};
pub use presence::{PresenceStore, UserStatus};

#[cfg(test)]
pub use chatroom::MockRoomRepository;
#[cfg(test)]
pub use message::MockMessageRepository;
