//! Response DTOs
//!
//! Data structures for API response bodies. Snowflake IDs are rendered as
//! strings so JavaScript clients don't lose precision.

use serde::{Deserialize, Serialize};

use crate::domain::{Chatroom, ChatroomMember, Message, UserId, UserStatus};

/// Chatroom member response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberResponse {
    pub user_id: UserId,
    pub username: String,
    pub joined_at: String,
}

impl From<&ChatroomMember> for MemberResponse {
    fn from(member: &ChatroomMember) -> Self {
        Self {
            user_id: member.user_id,
            username: member.username.clone(),
            joined_at: member.joined_at.to_rfc3339(),
        }
    }
}

/// Chatroom response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatroomResponse {
    pub id: String,
    pub name: String,
    pub created_by: UserId,
    pub created_at: String,
    pub members: Vec<MemberResponse>,
}

impl From<Chatroom> for ChatroomResponse {
    fn from(room: Chatroom) -> Self {
        Self {
            id: room.id.to_string(),
            members: room.members.iter().map(MemberResponse::from).collect(),
            name: room.name,
            created_by: room.created_by,
            created_at: room.created_at.to_rfc3339(),
        }
    }
}

/// Message response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub chatroom_id: String,
    pub sender_id: UserId,
    pub sender_name: String,
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    pub sent_at: String,
}

impl From<&Message> for MessageResponse {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.to_string(),
            chatroom_id: message.chatroom_id.to_string(),
            sender_id: message.sender_id,
            sender_name: message.sender_name.clone(),
            message_type: message.message_type.as_str().to_string(),
            text_content: message.text_content.clone(),
            media_url: message.media_url.clone(),
            sent_at: message.sent_at.to_rfc3339(),
        }
    }
}

/// `{"chatroom": ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatroomEnvelope {
    pub chatroom: ChatroomResponse,
}

/// `{"chatrooms": [...]}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatroomListResponse {
    pub chatrooms: Vec<ChatroomResponse>,
}

/// Join response
#[derive(Debug, Serialize, Deserialize)]
pub struct JoinChatroomResponse {
    pub message: String,
    pub chatroom: ChatroomResponse,
}

/// `{"message": ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub message: MessageResponse,
}

/// `{"messages": [...]}`
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageListResponse {
    pub messages: Vec<MessageResponse>,
}

/// User presence response
#[derive(Debug, Serialize, Deserialize)]
pub struct UserStatusResponse {
    pub user_id: UserId,
    pub status: UserStatus,
}
