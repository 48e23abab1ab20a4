//! WebSocket Message Types
//!
//! Gateway frame format: `{op, d, s, t}`.

use serde::{Deserialize, Serialize};

use crate::application::dto::response::{MemberResponse, MessageResponse};
use crate::domain::{Chatroom, ChatroomMember, Identity, Message, UserId};

/// Gateway opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Event dispatch
    Dispatch = 0,
    /// Heartbeat
    Heartbeat = 1,
    /// Hello
    Hello = 10,
    /// Heartbeat ACK
    HeartbeatAck = 11,
}

/// Incoming gateway message
#[derive(Debug, Deserialize)]
pub struct GatewayReceive {
    pub op: u8,
    #[serde(default)]
    pub d: Option<serde_json::Value>,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

/// Outgoing gateway message
#[derive(Debug, Clone, Serialize)]
pub struct GatewaySend {
    pub op: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewaySend {
    pub fn hello(heartbeat_interval: u64) -> Self {
        Self {
            op: OpCode::Hello as u8,
            d: serde_json::to_value(HelloPayload { heartbeat_interval }).ok(),
            s: None,
            t: None,
        }
    }

    pub fn heartbeat_ack() -> Self {
        Self {
            op: OpCode::HeartbeatAck as u8,
            d: None,
            s: None,
            t: None,
        }
    }

    /// Dispatch frame without a sequence number; the connection stamps `s`
    /// when it writes the frame.
    pub fn dispatch(event: &GatewayEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            op: OpCode::Dispatch as u8,
            d: Some(event.to_json()?),
            s: None,
            t: Some(event.event_name().to_string()),
        })
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.s = Some(sequence);
        self
    }
}

/// Hello payload (op 10)
#[derive(Debug, Serialize)]
pub struct HelloPayload {
    pub heartbeat_interval: u64,
}

/// Ready payload (dispatch READY)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyPayload {
    pub user: UserObject,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserObject {
    pub id: UserId,
    pub username: String,
}

impl From<&Identity> for UserObject {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.user_id,
            username: identity.username.clone(),
        }
    }
}

/// Member joined a room (dispatch CHATROOM_MEMBER_ADD)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatroomMemberAddEvent {
    pub chatroom_id: String,
    pub member: MemberResponse,
}

/// Server-to-client dispatch events
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready(ReadyPayload),
    MessageCreate(MessageResponse),
    ChatroomMemberAdd(ChatroomMemberAddEvent),
}

impl GatewayEvent {
    pub fn message_create(message: &Message) -> Self {
        GatewayEvent::MessageCreate(MessageResponse::from(message))
    }

    pub fn member_add(room: &Chatroom, member: &ChatroomMember) -> Self {
        GatewayEvent::ChatroomMemberAdd(ChatroomMemberAddEvent {
            chatroom_id: room.id.to_string(),
            member: MemberResponse::from(member),
        })
    }

    /// Get the event name for dispatch
    pub fn event_name(&self) -> &'static str {
        match self {
            GatewayEvent::Ready(_) => "READY",
            GatewayEvent::MessageCreate(_) => "MESSAGE_CREATE",
            GatewayEvent::ChatroomMemberAdd(_) => "CHATROOM_MEMBER_ADD",
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            GatewayEvent::Ready(e) => serde_json::to_value(e),
            GatewayEvent::MessageCreate(e) => serde_json::to_value(e),
            GatewayEvent::ChatroomMemberAdd(e) => serde_json::to_value(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessagePayload;
    use chrono::Utc;

    #[test]
    fn dispatch_frame_carries_event_name_and_sequence() {
        let message = Message::new(
            1,
            2,
            &Identity::new(3, "carol"),
            MessagePayload::parse("text", Some("hello".into()), None).unwrap(),
            Utc::now(),
        );

        let frame = GatewaySend::dispatch(&GatewayEvent::message_create(&message))
            .unwrap()
            .with_sequence(4);
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["op"], 0);
        assert_eq!(json["s"], 4);
        assert_eq!(json["t"], "MESSAGE_CREATE");
        assert_eq!(json["d"]["text_content"], "hello");
        assert_eq!(json["d"]["chatroom_id"], "2");
    }

    #[test]
    fn control_frames_omit_empty_fields() {
        let ack = serde_json::to_value(GatewaySend::heartbeat_ack()).unwrap();
        assert_eq!(ack, serde_json::json!({"op": 11}));

        let hello = serde_json::to_value(GatewaySend::hello(30_000)).unwrap();
        assert_eq!(hello["d"]["heartbeat_interval"], 30_000);
    }

    #[test]
    fn receive_accepts_bare_heartbeat() {
        let frame: GatewayReceive = serde_json::from_str(r#"{"op": 1}"#).unwrap();
        assert_eq!(frame.op, OpCode::Heartbeat as u8);
        assert!(frame.d.is_none());
    }
}
