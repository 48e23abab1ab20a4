//! WebSocket Connection Handler
//!
//! Runs one gateway connection. The caller was authenticated by the auth
//! middleware before the upgrade, so the connection is registered with the
//! hub immediately and answers with Hello then READY.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Extension, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval, timeout, MissedTickBehavior};

use super::connection::{CloseReason, ConnectionSession};
use super::hub::DeliveryHub;
use super::messages::{
    GatewayEvent, GatewayReceive, GatewaySend, OpCode, ReadyPayload, UserObject,
};
use crate::domain::{Activity, ActivityKind, ClientMetadata, Identity, PresenceStore, UserId};
use crate::presentation::http::extractors::ClientInfo;
use crate::presentation::middleware::AuthUser;
use crate::startup::AppState;

type WsSink = SplitSink<WebSocket, WsMessage>;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ClientInfo(client): ClientInfo,
) -> Response {
    let limits = &state.settings.websocket;
    ws.max_message_size(limits.max_message_size)
        .max_frame_size(limits.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state, auth.identity, client))
}

/// Handle individual WebSocket connection
async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    identity: Identity,
    client: ClientMetadata,
) {
    let ws_settings = state.settings.websocket.clone();
    let write_timeout = ws_settings.write_timeout();
    let (mut sink, mut stream) = socket.split();

    let (tx, mut rx) = mpsc::channel::<GatewaySend>(ws_settings.outbound_buffer);
    let handle = match state.hub.register(identity.user_id, tx) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::debug!(user_id = identity.user_id, error = %e, "Rejecting connection");
            let _ = timeout(write_timeout, sink.send(WsMessage::Close(None))).await;
            return;
        }
    };

    let mut session = ConnectionSession::new(handle.connection_id, identity.user_id);
    if let Err(e) = session.open() {
        tracing::error!(error = %e, "Connection failed to open");
        state.hub.unregister(&handle);
        return;
    }

    if let Err(e) = state.presence.mark_online(identity.user_id).await {
        tracing::warn!(user_id = identity.user_id, error = %e, "Failed to mark user online");
    }
    state.activity.record(Activity::now(
        identity.user_id,
        ActivityKind::GatewayConnected,
        client.clone(),
    ));

    tracing::info!(
        user_id = identity.user_id,
        connection_id = %handle.connection_id,
        "User connected"
    );

    let reason = match greet(&mut sink, &mut session, &identity, &ws_settings).await {
        Ok(()) => run(&mut sink, &mut stream, &mut rx, &mut session, &state).await,
        Err(reason) => reason,
    };

    // Cleanup
    session.begin_closing(reason);
    let _ = timeout(write_timeout, sink.send(WsMessage::Close(None))).await;
    state.hub.unregister(&handle);
    release_presence(&state.hub, state.presence.as_ref(), identity.user_id).await;

    if let Err(e) = session.close() {
        tracing::debug!(error = %e, "Connection already closed");
    }

    state.activity.record(Activity::now(
        identity.user_id,
        ActivityKind::GatewayDisconnected,
        client,
    ));
    tracing::info!(
        user_id = identity.user_id,
        connection_id = %handle.connection_id,
        reason = reason.as_str(),
        "User disconnected"
    );
}

/// Send Hello and READY.
async fn greet(
    sink: &mut WsSink,
    session: &mut ConnectionSession,
    identity: &Identity,
    ws_settings: &crate::config::WebSocketSettings,
) -> Result<(), CloseReason> {
    let write_timeout = ws_settings.write_timeout();
    write_frame(
        sink,
        &GatewaySend::hello(ws_settings.heartbeat_interval_ms),
        write_timeout,
    )
    .await?;

    let ready = GatewayEvent::Ready(ReadyPayload {
        user: UserObject::from(identity),
        session_id: session.connection_id.to_string(),
    });
    let frame = GatewaySend::dispatch(&ready).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialize READY");
        CloseReason::ProtocolError
    })?;
    write_frame(sink, &frame.with_sequence(session.next_sequence()), write_timeout).await
}

/// Main message loop. Returns why the connection is closing.
async fn run(
    sink: &mut WsSink,
    stream: &mut futures::stream::SplitStream<WebSocket>,
    rx: &mut mpsc::Receiver<GatewaySend>,
    session: &mut ConnectionSession,
    state: &AppState,
) -> CloseReason {
    let ws_settings = &state.settings.websocket;
    let write_timeout = ws_settings.write_timeout();
    let idle_timeout = ws_settings.idle_timeout();

    let mut idle_check = interval(ws_settings.heartbeat_interval());
    idle_check.set_missed_tick_behavior(MissedTickBehavior::Delay);
    idle_check.tick().await; // Skip first immediate tick

    loop {
        tokio::select! {
            // Frames queued by the hub
            outbound = rx.recv() => {
                let Some(frame) = outbound else {
                    // The hub dropped our queue.
                    return if state.hub.is_accepting() {
                        CloseReason::Evicted
                    } else {
                        CloseReason::ServerShutdown
                    };
                };
                let frame = frame.with_sequence(session.next_sequence());
                if let Err(reason) = write_frame(sink, &frame, write_timeout).await {
                    return reason;
                }
            }

            // Frames from the client
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        match handle_message(text.as_str(), session, state).await {
                            Ok(Some(reply)) => {
                                if let Err(reason) = write_frame(sink, &reply, write_timeout).await {
                                    return reason;
                                }
                            }
                            Ok(None) => {}
                            Err(e) => {
                                tracing::debug!(
                                    connection_id = %session.connection_id,
                                    error = %e,
                                    "Error handling message"
                                );
                            }
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => return CloseReason::ClientClosed,
                    Some(Ok(_)) => {
                        // Ping/pong are answered by axum; binary frames are ignored
                    }
                    Some(Err(e)) => {
                        tracing::debug!(
                            connection_id = %session.connection_id,
                            error = %e,
                            "WebSocket error"
                        );
                        return CloseReason::ProtocolError;
                    }
                }
            }

            _ = idle_check.tick() => {
                if !session.is_alive(idle_timeout) {
                    tracing::info!(
                        connection_id = %session.connection_id,
                        "Heartbeat timeout, closing connection"
                    );
                    return CloseReason::IdleTimeout;
                }
            }
        }
    }
}

/// Mark the user offline once their last connection is gone.
///
/// A connection registered while the offline write was in flight has
/// already marked the user online, so the flag is restored afterwards.
async fn release_presence(hub: &DeliveryHub, presence: &dyn PresenceStore, user_id: UserId) {
    if hub.is_user_online(user_id) {
        return;
    }
    if let Err(e) = presence.mark_offline(user_id).await {
        tracing::warn!(user_id, error = %e, "Failed to mark user offline");
    }
    if hub.is_user_online(user_id) {
        tracing::debug!(user_id, "User reconnected while going offline");
        if let Err(e) = presence.mark_online(user_id).await {
            tracing::warn!(user_id, error = %e, "Failed to restore online status");
        }
    }
}

/// Handle incoming gateway frame, returning an optional reply.
async fn handle_message(
    text: &str,
    session: &mut ConnectionSession,
    state: &AppState,
) -> Result<Option<GatewaySend>, String> {
    let frame: GatewayReceive =
        serde_json::from_str(text).map_err(|e| format!("Invalid frame: {}", e))?;

    match frame.op {
        op if op == OpCode::Heartbeat as u8 => {
            session.heartbeat();
            if let Err(e) = state.presence.mark_online(session.user_id).await {
                tracing::debug!(user_id = session.user_id, error = %e, "Presence refresh failed");
            }
            tracing::trace!(connection_id = %session.connection_id, "Heartbeat received");
            Ok(Some(GatewaySend::heartbeat_ack()))
        }
        op => {
            tracing::debug!(connection_id = %session.connection_id, op, "Unknown opcode");
            Ok(None)
        }
    }
}

async fn write_frame(
    sink: &mut WsSink,
    frame: &GatewaySend,
    write_timeout: Duration,
) -> Result<(), CloseReason> {
    let text = serde_json::to_string(frame).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialize frame");
        CloseReason::ProtocolError
    })?;

    match timeout(write_timeout, sink.send(WsMessage::Text(text.into()))).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "WebSocket write failed");
            Err(CloseReason::WriteFailed)
        }
        Err(_) => {
            tracing::debug!(timeout_ms = write_timeout.as_millis() as u64, "WebSocket write timed out");
            Err(CloseReason::WriteFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::domain::{RepositoryError, UserStatus};
    use crate::infrastructure::cache::LocalPresenceStore;

    /// A second connection for the user registers and goes online while
    /// the offline write is still in flight.
    struct ReconnectingPresence {
        inner: LocalPresenceStore,
        hub: Arc<DeliveryHub>,
        reconnect: mpsc::Sender<GatewaySend>,
    }

    #[async_trait]
    impl PresenceStore for ReconnectingPresence {
        async fn mark_online(&self, user_id: UserId) -> Result<(), RepositoryError> {
            self.inner.mark_online(user_id).await
        }

        async fn mark_offline(&self, user_id: UserId) -> Result<(), RepositoryError> {
            self.hub
                .register(user_id, self.reconnect.clone())
                .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;
            self.inner.mark_online(user_id).await?;
            self.inner.mark_offline(user_id).await
        }

        async fn status(&self, user_id: UserId) -> Result<UserStatus, RepositoryError> {
            self.inner.status(user_id).await
        }
    }

    #[tokio::test]
    async fn reconnect_during_release_stays_online() {
        let hub = Arc::new(DeliveryHub::new());
        let (tx, _rx) = mpsc::channel(4);
        let presence = ReconnectingPresence {
            inner: LocalPresenceStore::new(Duration::from_secs(60)),
            hub: Arc::clone(&hub),
            reconnect: tx,
        };

        release_presence(&hub, &presence, 7).await;

        assert!(hub.is_user_online(7));
        assert_eq!(presence.status(7).await.unwrap(), UserStatus::Online);
    }

    #[tokio::test]
    async fn last_connection_gone_marks_offline() {
        let hub = DeliveryHub::new();
        let presence = LocalPresenceStore::new(Duration::from_secs(60));
        presence.mark_online(7).await.unwrap();

        release_presence(&hub, &presence, 7).await;
        assert_eq!(presence.status(7).await.unwrap(), UserStatus::Offline);

        // Another open connection keeps the user online
        let (tx, _rx) = mpsc::channel(4);
        hub.register(7, tx).unwrap();
        presence.mark_online(7).await.unwrap();
        release_presence(&hub, &presence, 7).await;
        assert_eq!(presence.status(7).await.unwrap(), UserStatus::Online);
    }
}
