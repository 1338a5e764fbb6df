//! Message routing
//!
//! The router turns one normalized inbound message into zero or more
//! addressed [`Delivery`]s. It has no state of its own: everything it
//! knows comes from the [`ConnectionRegistry`] it borrows for the duration
//! of one message, so a routing decision is atomic with respect to every
//! other message.
//!
//! Routing is keyed purely by explicit target ids. When a target cannot be
//! resolved the message is dropped and logged; it is never fanned out to
//! unrelated connections.

pub mod delivery;
pub mod liveness;

use std::time::Instant;

use serde_json::Value;

use crate::protocol::{ClientMessage, IceTarget, ServerEvent};
use crate::registry::{BroadcasterId, ConnectionId, ConnectionRegistry};

pub use delivery::{Delivery, Recipient};

/// Routes signaling messages through a borrowed registry
pub struct MessageRouter<'r> {
    registry: &'r mut ConnectionRegistry,
}

impl<'r> MessageRouter<'r> {
    pub fn new(registry: &'r mut ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Route one message that arrived on connection `from`
    pub fn route(&mut self, from: &ConnectionId, message: ClientMessage, now: Instant) -> Vec<Delivery> {
        if let Some(id) = self.registry.find_by_transport(from).map(|e| e.id.clone()) {
            self.registry.touch(&id, now);
        }

        match message {
            ClientMessage::Register { id, name } => self.register(from, id, name, now),
            ClientMessage::Unregister { id } => self.unregister(from, id),
            ClientMessage::ListBroadcasters => self.list(from),
            ClientMessage::ConnectRequest { broadcaster_id } => self.connect_request(from, broadcaster_id),
            ClientMessage::Offer {
                sdp,
                broadcaster_id,
                target_viewer_id,
            } => self.offer(from, sdp, broadcaster_id, target_viewer_id, now),
            ClientMessage::Answer {
                sdp,
                target_broadcaster_id,
            } => self.answer(from, sdp, target_broadcaster_id),
            ClientMessage::IceCandidate {
                candidate,
                target,
                broadcaster_id,
            } => self.ice_candidate(from, candidate, target, broadcaster_id, now),
            ClientMessage::SwitchCamera { broadcaster_id } => self.switch_camera(from, broadcaster_id),
        }
    }

    fn register(
        &mut self,
        from: &ConnectionId,
        id: Option<BroadcasterId>,
        name: Option<String>,
        now: Instant,
    ) -> Vec<Delivery> {
        let registration = self.registry.register(id, name, from, now);

        let mut deliveries = vec![Delivery::to(
            from,
            ServerEvent::MonitorNumber {
                broadcaster_id: registration.id.clone(),
                number: registration.monitor_number,
            },
        )];

        if let Some(entry) = self.registry.lookup(&registration.id) {
            deliveries.push(Delivery::to_others(
                from,
                ServerEvent::BroadcasterJoined(entry.summary()),
            ));
        }

        deliveries
    }

    fn unregister(&mut self, from: &ConnectionId, id: BroadcasterId) -> Vec<Delivery> {
        match self.registry.unregister(&id) {
            None => {
                tracing::warn!(
                    connection = %from,
                    broadcaster = %id,
                    "Unregister for unknown broadcaster dropped"
                );
                Vec::new()
            }
            // Viewers heard about a dead entry when its transport closed
            Some(entry) if !entry.is_live() => Vec::new(),
            Some(_) => vec![Delivery::to_others(
                from,
                ServerEvent::BroadcasterDisconnected(id),
            )],
        }
    }

    fn list(&self, from: &ConnectionId) -> Vec<Delivery> {
        let live = self
            .registry
            .list_live()
            .into_iter()
            .map(|e| e.summary())
            .collect();

        vec![Delivery::to(from, ServerEvent::BroadcasterList(live))]
    }

    fn connect_request(&self, from: &ConnectionId, broadcaster_id: BroadcasterId) -> Vec<Delivery> {
        match self.registry.lookup_live(&broadcaster_id) {
            Some(entry) => {
                tracing::debug!(
                    viewer = %from,
                    broadcaster = %broadcaster_id,
                    "Viewer requested connection"
                );
                vec![Delivery::to(
                    &entry.transport,
                    ServerEvent::ViewerRequestedConnection {
                        viewer_id: from.clone(),
                    },
                )]
            }
            None => {
                tracing::warn!(
                    viewer = %from,
                    broadcaster = %broadcaster_id,
                    "Connect request for broadcaster that is not live"
                );
                vec![Delivery::to(
                    from,
                    ServerEvent::BroadcasterNotFound { broadcaster_id },
                )]
            }
        }
    }

    fn offer(
        &mut self,
        from: &ConnectionId,
        sdp: Value,
        claimed: Option<BroadcasterId>,
        target_viewer_id: ConnectionId,
        now: Instant,
    ) -> Vec<Delivery> {
        let broadcaster_id = self.resolve_broadcaster(from, claimed, now);

        tracing::debug!(
            broadcaster = %broadcaster_id,
            viewer = %target_viewer_id,
            "Forwarding offer"
        );

        vec![Delivery::to(
            &target_viewer_id,
            ServerEvent::Offer {
                sdp,
                broadcaster_id,
            },
        )]
    }

    fn answer(&self, from: &ConnectionId, sdp: Value, target: BroadcasterId) -> Vec<Delivery> {
        let Some(entry) = self.registry.lookup_live(&target) else {
            tracing::warn!(
                viewer = %from,
                broadcaster = %target,
                "Answer for broadcaster that is not live dropped"
            );
            return Vec::new();
        };

        tracing::debug!(viewer = %from, broadcaster = %target, "Forwarding answer");

        vec![Delivery::to(
            &entry.transport,
            ServerEvent::Answer {
                sdp,
                viewer_id: from.clone(),
            },
        )]
    }

    fn ice_candidate(
        &mut self,
        from: &ConnectionId,
        candidate: Value,
        target: IceTarget,
        claimed: Option<BroadcasterId>,
        now: Instant,
    ) -> Vec<Delivery> {
        match target {
            IceTarget::Viewer(viewer) => {
                let broadcaster_id = self.resolve_broadcaster(from, claimed, now);
                tracing::trace!(
                    broadcaster = %broadcaster_id,
                    viewer = %viewer,
                    "Forwarding ICE candidate to viewer"
                );
                vec![Delivery::to(
                    &viewer,
                    ServerEvent::ice_from_broadcaster(candidate, broadcaster_id),
                )]
            }
            IceTarget::Broadcaster(broadcaster_id) => {
                match self.registry.lookup_live(&broadcaster_id) {
                    Some(entry) => vec![Delivery::to(
                        &entry.transport,
                        ServerEvent::ice_from_viewer(candidate, from.clone()),
                    )],
                    None => {
                        tracing::debug!(
                            viewer = %from,
                            broadcaster = %broadcaster_id,
                            "ICE candidate for broadcaster that is not live dropped"
                        );
                        Vec::new()
                    }
                }
            }
        }
    }

    fn switch_camera(&self, from: &ConnectionId, broadcaster_id: BroadcasterId) -> Vec<Delivery> {
        let Some(entry) = self.registry.lookup_live(&broadcaster_id) else {
            tracing::warn!(
                viewer = %from,
                broadcaster = %broadcaster_id,
                "Camera switch for broadcaster that is not live dropped"
            );
            return Vec::new();
        };

        vec![Delivery::to(
            &entry.transport,
            ServerEvent::SwitchCameraRequest {
                viewer_id: from.clone(),
            },
        )]
    }

    /// Work out which broadcaster a broadcaster-side message comes from
    ///
    /// Uses the claimed id, then the sender's registration, then the
    /// sender's connection id. A sender with no live entry is registered
    /// on the spot so clients that lost their registration keep working.
    fn resolve_broadcaster(
        &mut self,
        from: &ConnectionId,
        claimed: Option<BroadcasterId>,
        now: Instant,
    ) -> BroadcasterId {
        let id = claimed
            .or_else(|| self.registry.find_by_transport(from).map(|e| e.id.clone()))
            .unwrap_or_else(|| BroadcasterId::from(from));

        if self.registry.lookup_live(&id).is_none() {
            tracing::warn!(
                connection = %from,
                broadcaster = %id,
                "Signaling from unregistered broadcaster, registering now"
            );
            self.registry.register(Some(id.clone()), None, from, now);
        }

        id
    }
}
