//! Outbound events
//!
//! Every event is encoded as `{"event": "<kebab-name>", "data": <payload>}`.

use serde::Serialize;
use serde_json::Value;

use crate::registry::{BroadcasterId, BroadcasterSummary, ConnectionId};

/// Event sent from the relay to a client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Registration acknowledgement, to the registering connection only
    #[serde(rename_all = "camelCase")]
    MonitorNumber {
        broadcaster_id: BroadcasterId,
        number: u32,
    },

    /// A broadcaster registered
    BroadcasterJoined(BroadcasterSummary),

    /// A broadcaster went away; the payload is the bare id
    BroadcasterDisconnected(BroadcasterId),

    /// Reply to a list request
    BroadcasterList(Vec<BroadcasterSummary>),

    /// A viewer asked the broadcaster for a stream
    #[serde(rename_all = "camelCase")]
    ViewerRequestedConnection { viewer_id: ConnectionId },

    /// SDP offer, broadcaster to viewer
    #[serde(rename_all = "camelCase")]
    Offer {
        sdp: Value,
        broadcaster_id: BroadcasterId,
    },

    /// SDP answer, viewer to broadcaster
    #[serde(rename_all = "camelCase")]
    Answer { sdp: Value, viewer_id: ConnectionId },

    /// ICE candidate tagged with the sender's role identifier
    #[serde(rename_all = "camelCase")]
    IceCandidate {
        candidate: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        broadcaster_id: Option<BroadcasterId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        viewer_id: Option<ConnectionId>,
    },

    /// A viewer asked the broadcaster to flip cameras
    #[serde(rename_all = "camelCase")]
    SwitchCameraRequest { viewer_id: ConnectionId },

    /// The broadcaster a viewer asked for is not live
    #[serde(rename_all = "camelCase")]
    BroadcasterNotFound { broadcaster_id: BroadcasterId },
}

impl ServerEvent {
    /// Candidate travelling from a broadcaster to a viewer
    pub fn ice_from_broadcaster(candidate: Value, broadcaster_id: BroadcasterId) -> Self {
        ServerEvent::IceCandidate {
            candidate,
            broadcaster_id: Some(broadcaster_id),
            viewer_id: None,
        }
    }

    /// Candidate travelling from a viewer to a broadcaster
    pub fn ice_from_viewer(candidate: Value, viewer_id: ConnectionId) -> Self {
        ServerEvent::IceCandidate {
            candidate,
            broadcaster_id: None,
            viewer_id: Some(viewer_id),
        }
    }

    /// Wire event name
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerEvent::MonitorNumber { .. } => "monitor-number",
            ServerEvent::BroadcasterJoined(_) => "broadcaster-joined",
            ServerEvent::BroadcasterDisconnected(_) => "broadcaster-disconnected",
            ServerEvent::BroadcasterList(_) => "broadcaster-list",
            ServerEvent::ViewerRequestedConnection { .. } => "viewer-requested-connection",
            ServerEvent::Offer { .. } => "offer",
            ServerEvent::Answer { .. } => "answer",
            ServerEvent::IceCandidate { .. } => "ice-candidate",
            ServerEvent::SwitchCameraRequest { .. } => "switch-camera-request",
            ServerEvent::BroadcasterNotFound { .. } => "broadcaster-not-found",
        }
    }

    /// Encode as a text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn bid(id: &str) -> BroadcasterId {
        BroadcasterId::parse(id).unwrap()
    }

    fn encode(event: &ServerEvent) -> Value {
        serde_json::from_str(&event.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_monitor_number_shape() {
        let event = ServerEvent::MonitorNumber {
            broadcaster_id: bid("A1"),
            number: 1,
        };

        assert_eq!(
            encode(&event),
            json!({"event": "monitor-number", "data": {"broadcasterId": "A1", "number": 1}})
        );
    }

    #[test]
    fn test_disconnected_is_bare_string() {
        let event = ServerEvent::BroadcasterDisconnected(bid("A1"));

        assert_eq!(
            encode(&event),
            json!({"event": "broadcaster-disconnected", "data": "A1"})
        );
    }

    #[test]
    fn test_list_shape() {
        let event = ServerEvent::BroadcasterList(vec![BroadcasterSummary {
            id: bid("A1"),
            name: "Cam1".into(),
            monitor_number: 1,
        }]);

        assert_eq!(
            encode(&event),
            json!({
                "event": "broadcaster-list",
                "data": [{"id": "A1", "name": "Cam1", "monitorNumber": 1}]
            })
        );
    }

    #[test]
    fn test_ice_candidate_tags_one_role() {
        let event = ServerEvent::ice_from_viewer(json!({"candidate": "c"}), ConnectionId::new("V1"));

        assert_eq!(
            encode(&event),
            json!({"event": "ice-candidate", "data": {"candidate": {"candidate": "c"}, "viewerId": "V1"}})
        );
    }

    #[test]
    fn test_event_names_match_encoding() {
        let events = vec![
            ServerEvent::ViewerRequestedConnection {
                viewer_id: ConnectionId::new("V1"),
            },
            ServerEvent::SwitchCameraRequest {
                viewer_id: ConnectionId::new("V1"),
            },
            ServerEvent::BroadcasterNotFound {
                broadcaster_id: bid("A1"),
            },
            ServerEvent::Answer {
                sdp: json!("v=0"),
                viewer_id: ConnectionId::new("V1"),
            },
        ];

        for event in events {
            assert_eq!(encode(&event)["event"], json!(event.event_name()));
        }
    }
}
