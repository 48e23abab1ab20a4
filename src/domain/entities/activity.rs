//! User activity records and the fire-and-forget sink that receives them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::identity::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ChatroomCreated,
    ChatroomsListed,
    ChatroomJoined,
    MessageSent,
    MessagesListed,
    GatewayConnected,
    GatewayDisconnected,
}

impl ActivityKind {
    /// Human-readable label written to the sink.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ChatroomCreated => "Created chatroom",
            Self::ChatroomsListed => "Listed chatrooms",
            Self::ChatroomJoined => "Joined chatroom",
            Self::MessageSent => "Sent message",
            Self::MessagesListed => "Listed messages",
            Self::GatewayConnected => "Connected to gateway",
            Self::GatewayDisconnected => "Disconnected from gateway",
        }
    }
}

/// Where a request came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub user_id: UserId,
    pub kind: ActivityKind,
    pub timestamp: DateTime<Utc>,
    pub client: ClientMetadata,
}

impl Activity {
    pub fn now(user_id: UserId, kind: ActivityKind, client: ClientMetadata) -> Self {
        Self {
            user_id,
            kind,
            timestamp: Utc::now(),
            client,
        }
    }
}

/// Receives activity records. Implementations must not block the caller and
/// must swallow their own failures.
pub trait ActivitySink: Send + Sync {
    fn record(&self, activity: Activity);
}
