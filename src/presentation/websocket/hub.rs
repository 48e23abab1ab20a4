//! Live Delivery Hub
//!
//! Maps users to their open gateway connections and pushes new messages to
//! every connected member of a room. Delivery is best-effort: a connection
//! whose outbound queue is full or closed is evicted and resynchronizes from
//! history after reconnecting.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::messages::{GatewayEvent, GatewaySend};
use crate::application::services::DeliveryNotifier;
use crate::domain::{Chatroom, ChatroomMember, Message, UserId};
use crate::infrastructure::metrics;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("Delivery hub is shut down")]
    HubClosed,

    #[error("Failed to serialize event: {0}")]
    Serialization(String),

    #[error("Outbound queue full")]
    QueueFull,

    #[error("Connection closed")]
    ConnectionClosed,
}

/// Identifies one registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub user_id: UserId,
    pub connection_id: Uuid,
}

struct ConnectionEntry {
    id: Uuid,
    sender: mpsc::Sender<GatewaySend>,
}

impl ConnectionEntry {
    fn deliver(&self, frame: GatewaySend) -> Result<(), DeliveryError> {
        self.sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::QueueFull,
            TrySendError::Closed(_) => DeliveryError::ConnectionClosed,
        })
    }
}

/// Registry of open connections by user.
pub struct DeliveryHub {
    connections: DashMap<UserId, Vec<ConnectionEntry>>,
    accepting: AtomicBool,
}

impl DeliveryHub {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            accepting: AtomicBool::new(true),
        }
    }

    /// Add a connection's outbound queue under `user_id`.
    pub fn register(
        &self,
        user_id: UserId,
        sender: mpsc::Sender<GatewaySend>,
    ) -> Result<ConnectionHandle, DeliveryError> {
        if !self.is_accepting() {
            return Err(DeliveryError::HubClosed);
        }

        let handle = ConnectionHandle {
            user_id,
            connection_id: Uuid::new_v4(),
        };
        self.connections
            .entry(user_id)
            .or_default()
            .push(ConnectionEntry {
                id: handle.connection_id,
                sender,
            });

        // A teardown that ran between the check and the insert has already
        // cleared the registry.
        if !self.is_accepting() {
            self.unregister(&handle);
            return Err(DeliveryError::HubClosed);
        }

        metrics::set_websocket_connections(self.connection_count());
        tracing::info!(
            user_id,
            connection_id = %handle.connection_id,
            "Connection registered"
        );
        Ok(handle)
    }

    /// Remove a connection. Returns `false` if it was already gone.
    pub fn unregister(&self, handle: &ConnectionHandle) -> bool {
        let removed = match self.connections.get_mut(&handle.user_id) {
            Some(mut entries) => {
                let before = entries.len();
                entries.retain(|e| e.id != handle.connection_id);
                entries.len() != before
            }
            None => false,
        };
        self.connections
            .remove_if(&handle.user_id, |_, entries| entries.is_empty());

        if removed {
            metrics::set_websocket_connections(self.connection_count());
            tracing::info!(
                user_id = handle.user_id,
                connection_id = %handle.connection_id,
                "Connection unregistered"
            );
        }
        removed
    }

    /// Enqueue `event` on every open connection of `recipients`.
    /// Returns the number of connections the frame was queued on.
    pub fn broadcast(&self, event: &GatewayEvent, recipients: &[UserId]) -> usize {
        let frame = match GatewaySend::dispatch(event) {
            Ok(frame) => frame,
            Err(e) => {
                let error = DeliveryError::Serialization(e.to_string());
                tracing::error!(event = event.event_name(), error = %error, "Dropping event");
                metrics::record_delivery("serialization_error");
                return 0;
            }
        };

        let mut delivered = 0;
        let mut evicted = Vec::new();
        for user_id in recipients {
            let Some(entries) = self.connections.get(user_id) else {
                continue;
            };
            for entry in entries.iter() {
                match entry.deliver(frame.clone()) {
                    Ok(()) => {
                        delivered += 1;
                        metrics::record_delivery("delivered");
                    }
                    Err(reason) => {
                        metrics::record_delivery("evicted");
                        evicted.push((
                            ConnectionHandle {
                                user_id: *user_id,
                                connection_id: entry.id,
                            },
                            reason,
                        ));
                    }
                }
            }
        }

        for (handle, reason) in evicted {
            tracing::warn!(
                user_id = handle.user_id,
                connection_id = %handle.connection_id,
                reason = %reason,
                "Evicting connection"
            );
            self.unregister(&handle);
        }

        delivered
    }

    /// Stop accepting registrations and drop every outbound queue, which
    /// ends the connection tasks.
    pub fn teardown(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        let closed = self.connection_count();
        self.connections.clear();
        metrics::set_websocket_connections(0);
        tracing::info!(closed, "Delivery hub torn down");
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Check if user has at least one open connection
    pub fn is_user_online(&self, user_id: UserId) -> bool {
        self.connections
            .get(&user_id)
            .map(|entries| !entries.is_empty())
            .unwrap_or(false)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.iter().map(|entries| entries.len()).sum()
    }
}

impl Default for DeliveryHub {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryNotifier for DeliveryHub {
    fn message_created(&self, message: &Message, member_ids: &[UserId]) {
        let delivered = self.broadcast(&GatewayEvent::message_create(message), member_ids);
        tracing::debug!(
            message_id = message.id,
            room_id = message.chatroom_id,
            delivered,
            "Message fanned out"
        );
    }

    fn member_joined(&self, room: &Chatroom, member: &ChatroomMember) {
        self.broadcast(&GatewayEvent::member_add(room, member), &room.member_ids());
    }
}
