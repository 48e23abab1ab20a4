//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **MessagingService**: Chatroom creation/listing/joining, message send
//!   and history
//! - **RoomSequencer**: Per-room ordering slots used by message sends

pub mod messaging_service;
pub mod room_sequencer;

pub use messaging_service::{
    DeliveryNotifier, MessagingError, MessagingLimits, MessagingService, MessagingServiceImpl,
    SendMessageDto,
};
pub use room_sequencer::{RoomClock, RoomSequencer};
