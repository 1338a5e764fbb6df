//! Statistics for the relay

use std::time::{Duration, Instant};

use serde::Serialize;

/// Relay-wide counters, owned by the event loop
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStats {
    /// Total connections ever accepted
    pub total_connections: u64,
    /// Currently open connections
    pub active_connections: u64,
    /// Inbound messages that passed normalization
    pub messages_received: u64,
    /// Events handed to a connection's outbound queue
    pub events_delivered: u64,
    /// Events addressed to a connection that was not open
    pub events_dropped: u64,
    /// Dead broadcasters removed after their grace period
    pub broadcasters_reclaimed: u64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connect(&mut self) {
        self.total_connections += 1;
        self.active_connections += 1;
    }

    pub fn on_disconnect(&mut self) {
        self.active_connections = self.active_connections.saturating_sub(1);
    }
}

/// Process uptime tracker
#[derive(Debug, Clone, Copy)]
pub struct Uptime {
    started_at: Instant,
}

impl Uptime {
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_stats_new() {
        let stats = RelayStats::new();
        assert_eq!(stats.total_connections, 0);
        assert_eq!(stats.active_connections, 0);
        assert_eq!(stats.messages_received, 0);
        assert_eq!(stats.events_delivered, 0);
        assert_eq!(stats.events_dropped, 0);
        assert_eq!(stats.broadcasters_reclaimed, 0);
    }

    #[test]
    fn test_connection_counting() {
        let mut stats = RelayStats::new();

        stats.on_connect();
        stats.on_connect();
        stats.on_disconnect();

        assert_eq!(stats.total_connections, 2);
        assert_eq!(stats.active_connections, 1);

        // Never underflows on a stray disconnect
        stats.on_disconnect();
        stats.on_disconnect();
        assert_eq!(stats.active_connections, 0);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let json = serde_json::to_value(RelayStats::new()).unwrap();

        assert_eq!(json["totalConnections"], 0);
        assert_eq!(json["broadcastersReclaimed"], 0);
    }

    #[test]
    fn test_uptime_advances() {
        let uptime = Uptime::start();
        let first = uptime.elapsed();
        assert!(uptime.elapsed() >= first);
    }
}
