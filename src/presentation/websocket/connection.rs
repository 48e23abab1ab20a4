//! WebSocket Connection State
//!
//! Lifecycle of a single gateway connection:
//! `Connecting -> Open -> Closing -> Closed`.

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::domain::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Why a connection left `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    ClientClosed,
    WriteFailed,
    IdleTimeout,
    Evicted,
    ServerShutdown,
    ProtocolError,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::ClientClosed => "client_closed",
            CloseReason::WriteFailed => "write_failed",
            CloseReason::IdleTimeout => "idle_timeout",
            CloseReason::Evicted => "evicted",
            CloseReason::ServerShutdown => "server_shutdown",
            CloseReason::ProtocolError => "protocol_error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid connection transition from {from:?} to {to:?}")]
pub struct TransitionError {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

/// Per-connection state owned by the connection task.
#[derive(Debug)]
pub struct ConnectionSession {
    pub connection_id: Uuid,
    pub user_id: UserId,
    state: ConnectionState,
    close_reason: Option<CloseReason>,
    sequence: u64,
    last_heartbeat: Instant,
}

impl ConnectionSession {
    pub fn new(connection_id: Uuid, user_id: UserId) -> Self {
        Self {
            connection_id,
            user_id,
            state: ConnectionState::Connecting,
            close_reason: None,
            sequence: 0,
            last_heartbeat: Instant::now(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    /// Entered once the connection is registered with the hub.
    pub fn open(&mut self) -> Result<(), TransitionError> {
        self.transition(ConnectionState::Connecting, ConnectionState::Open)?;
        self.last_heartbeat = Instant::now();
        Ok(())
    }

    /// Move to `Closing`. Only the first reason is kept; later calls are
    /// no-ops and return `false`.
    pub fn begin_closing(&mut self, reason: CloseReason) -> bool {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open => {
                self.state = ConnectionState::Closing;
                self.close_reason = Some(reason);
                true
            }
            ConnectionState::Closing | ConnectionState::Closed => false,
        }
    }

    pub fn close(&mut self) -> Result<(), TransitionError> {
        self.transition(ConnectionState::Closing, ConnectionState::Closed)
    }

    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    pub fn heartbeat(&mut self) {
        self.last_heartbeat = Instant::now();
    }

    pub fn is_alive(&self, timeout: Duration) -> bool {
        self.last_heartbeat.elapsed() < timeout
    }

    fn transition(
        &mut self,
        from: ConnectionState,
        to: ConnectionState,
    ) -> Result<(), TransitionError> {
        if self.state != from {
            return Err(TransitionError {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}
