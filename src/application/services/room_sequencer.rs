//! Per-room persist slots.
//!
//! A send holds its room's slot while it stamps `sent_at`, writes the
//! message and hands it to live delivery. Within one room, stamps never go
//! backwards and pushes leave in the order messages were persisted. Slots
//! are process-local.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::RoomId;

/// Last committed `sent_at` of one room.
#[derive(Debug, Default)]
pub struct RoomClock {
    last_sent_at: Option<DateTime<Utc>>,
}

impl RoomClock {
    /// Timestamp for the next message: `now` truncated to the store's
    /// microsecond precision, never earlier than the last committed stamp.
    pub fn stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = now.trunc_subsecs(6);
        match self.last_sent_at {
            Some(last) if last > now => last,
            _ => now,
        }
    }

    /// Record a stamp once its message is stored, or may have been.
    pub fn commit(&mut self, sent_at: DateTime<Utc>) {
        self.last_sent_at = Some(sent_at);
    }
}

#[derive(Default)]
pub struct RoomSequencer {
    slots: DashMap<RoomId, Arc<Mutex<RoomClock>>>,
}

impl RoomSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of the room's slot.
    pub async fn acquire(&self, room_id: RoomId) -> OwnedMutexGuard<RoomClock> {
        let slot = Arc::clone(&*self.slots.entry(room_id).or_default());
        slot.lock_owned().await
    }
}
