//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints.

pub mod chatroom;
pub mod health;
pub mod message;
pub mod presence;

use crate::application::services::MessagingError;
use crate::domain::RoomId;
use crate::shared::error::AppError;

impl From<MessagingError> for AppError {
    fn from(e: MessagingError) -> Self {
        match e {
            MessagingError::Validation(message) => AppError::validation(message),
            MessagingError::RoomNotFound => AppError::NotFound(e.to_string()),
            MessagingError::AlreadyMember | MessagingError::DuplicateName => {
                AppError::Conflict(e.to_string())
            }
            MessagingError::NotMember => AppError::Forbidden(e.to_string()),
            MessagingError::Unavailable(_)
            | MessagingError::Timeout
            | MessagingError::OutcomeUnknown => AppError::Internal(e.to_string()),
        }
    }
}

/// Parse a chatroom id from the path.
pub(crate) fn parse_room_id(raw: &str) -> Result<RoomId, AppError> {
    crate::shared::snowflake::parse(raw)
        .ok_or_else(|| AppError::BadRequest("Invalid chatroom ID".into()))
}
