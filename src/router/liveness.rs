//! Liveness and cleanup
//!
//! A closed transport does not remove its broadcaster: the entry turns
//! dead, viewers are told once, and the entry waits out the grace period
//! so a quick app restart gets its old monitor number back.

use std::time::Instant;

use super::{Delivery, MessageRouter};
use crate::protocol::ServerEvent;
use crate::registry::{BroadcasterId, ConnectionId};

impl MessageRouter<'_> {
    /// Handle a transport that closed, cleanly or not
    ///
    /// Emits one `broadcaster-disconnected` per broadcaster that was live
    /// on this transport and nothing for entries that were already dead.
    pub fn transport_closed(&mut self, transport: &ConnectionId, now: Instant) -> Vec<Delivery> {
        self.registry
            .mark_disconnected(transport, now)
            .into_iter()
            .map(|id| Delivery::to_others(transport, ServerEvent::BroadcasterDisconnected(id)))
            .collect()
    }

    /// Drop dead entries whose grace period has run out
    ///
    /// Viewers were notified at disconnect time, so this emits nothing.
    pub fn reclaim_expired(&mut self, now: Instant) -> Vec<BroadcasterId> {
        self.registry.reclaim_expired(now)
    }
}
