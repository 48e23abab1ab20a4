//! WebSocket Gateway
//!
//! Real-time delivery of new messages and joins to connected room members.

pub mod connection;
pub mod handler;
pub mod hub;
pub mod messages;

pub use connection::{CloseReason, ConnectionSession, ConnectionState};
pub use handler::ws_handler;
pub use hub::{ConnectionHandle, DeliveryError, DeliveryHub};
pub use messages::{GatewayEvent, GatewayReceive, GatewaySend, OpCode};
