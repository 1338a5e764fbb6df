//! Broadcaster entry and state types
//!
//! This module defines the per-broadcaster state stored in the registry.

use std::time::Instant;

use serde::Serialize;

use super::identity::{BroadcasterId, ConnectionId};

/// Liveness of a broadcaster entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    /// Owning transport is open and registered
    Live,
    /// Transport closed, entry kept until the grace period runs out
    Dead,
}

/// Entry for a single broadcaster in the registry
#[derive(Debug, Clone)]
pub struct BroadcasterSession {
    /// Stable broadcaster id
    pub id: BroadcasterId,

    /// Connection currently carrying this broadcaster.
    ///
    /// The transport layer owns the connection; the registry only keeps
    /// its id and never closes it.
    pub transport: ConnectionId,

    /// Name supplied by the publisher, if any
    pub custom_name: Option<String>,

    /// Display number, unique among live entries
    pub monitor_number: u32,

    /// Current liveness
    pub liveness: Liveness,

    /// Last registration or signaling message from this broadcaster
    pub last_activity_at: Instant,

    /// When the transport closed (None while live)
    pub disconnected_at: Option<Instant>,

    /// Registration order, used to break ordering ties
    pub(super) registered_seq: u64,
}

impl BroadcasterSession {
    pub(super) fn new(
        id: BroadcasterId,
        transport: ConnectionId,
        custom_name: Option<String>,
        monitor_number: u32,
        registered_seq: u64,
        now: Instant,
    ) -> Self {
        Self {
            id,
            transport,
            custom_name,
            monitor_number,
            liveness: Liveness::Live,
            last_activity_at: now,
            disconnected_at: None,
            registered_seq,
        }
    }

    /// Check if the entry is live
    pub fn is_live(&self) -> bool {
        self.liveness == Liveness::Live
    }

    /// Human-readable label, `Monitor <n>` unless the publisher named itself
    pub fn display_name(&self) -> String {
        match self.custom_name {
            Some(ref name) => name.clone(),
            None => format!("Monitor {}", self.monitor_number),
        }
    }

    /// Viewer-facing description of this broadcaster
    pub fn summary(&self) -> BroadcasterSummary {
        BroadcasterSummary {
            id: self.id.clone(),
            name: self.display_name(),
            monitor_number: self.monitor_number,
        }
    }

    pub(super) fn touch(&mut self, now: Instant) {
        self.last_activity_at = now;
    }

    pub(super) fn mark_dead(&mut self, now: Instant) {
        self.liveness = Liveness::Dead;
        self.disconnected_at = Some(now);
        self.last_activity_at = now;
    }

    pub(super) fn revive(&mut self, transport: ConnectionId, monitor_number: u32, now: Instant) {
        self.transport = transport;
        self.monitor_number = monitor_number;
        self.liveness = Liveness::Live;
        self.disconnected_at = None;
        self.last_activity_at = now;
    }
}

/// What viewers learn about a broadcaster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcasterSummary {
    pub id: BroadcasterId,
    pub name: String,
    pub monitor_number: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(name: Option<&str>) -> BroadcasterSession {
        BroadcasterSession::new(
            BroadcasterId::parse("cam").unwrap(),
            ConnectionId::new("c1"),
            name.map(str::to_owned),
            3,
            0,
            Instant::now(),
        )
    }

    #[test]
    fn test_default_display_name() {
        assert_eq!(session(None).display_name(), "Monitor 3");
        assert_eq!(session(Some("Porch")).display_name(), "Porch");
    }

    #[test]
    fn test_dead_and_revive() {
        let mut entry = session(None);
        let now = Instant::now();

        entry.mark_dead(now);
        assert!(!entry.is_live());
        assert_eq!(entry.disconnected_at, Some(now));

        entry.revive(ConnectionId::new("c2"), 1, now);
        assert!(entry.is_live());
        assert!(entry.disconnected_at.is_none());
        assert_eq!(entry.transport.as_str(), "c2");
        assert_eq!(entry.display_name(), "Monitor 1");
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let json = serde_json::to_value(session(Some("Cam1")).summary()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"id": "cam", "name": "Cam1", "monitorNumber": 3})
        );
    }
}
