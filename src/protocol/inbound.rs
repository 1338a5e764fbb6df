//! Inbound message normalization
//!
//! Clients send JSON envelopes `{"event": ..., "data": ...}`. Field shapes
//! vary between client generations (ids sent positionally, SDP as a raw
//! string or as an object, `null` standing in for "absent"), so every
//! envelope is normalized here into a [`ClientMessage`] before the router
//! sees it. Anything that cannot be normalized is rejected with a
//! [`ProtocolError`] and dropped by the caller.

use serde::Deserialize;
use serde_json::Value;

use super::error::ProtocolError;
use crate::registry::{BroadcasterId, ConnectionId};

/// Longest display name kept, in characters
pub const MAX_NAME_CHARS: usize = 64;

/// Raw wire envelope
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Where an ICE candidate should go
#[derive(Debug, Clone, PartialEq)]
pub enum IceTarget {
    /// From a broadcaster to one of its viewers
    Viewer(ConnectionId),
    /// From a viewer to a broadcaster
    Broadcaster(BroadcasterId),
}

/// Normalized inbound signaling message
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// `register-broadcaster`
    Register {
        id: Option<BroadcasterId>,
        name: Option<String>,
    },
    /// `unregister-broadcaster`
    Unregister { id: BroadcasterId },
    /// `list-broadcasters` / `viewer-connect`
    ListBroadcasters,
    /// `connect-to-broadcaster`
    ConnectRequest { broadcaster_id: BroadcasterId },
    /// `offer`
    Offer {
        sdp: Value,
        broadcaster_id: Option<BroadcasterId>,
        target_viewer_id: ConnectionId,
    },
    /// `answer`
    Answer {
        sdp: Value,
        target_broadcaster_id: BroadcasterId,
    },
    /// `ice-candidate`
    IceCandidate {
        candidate: Value,
        target: IceTarget,
        broadcaster_id: Option<BroadcasterId>,
    },
    /// `switch-camera`
    SwitchCamera { broadcaster_id: BroadcasterId },
}

impl ClientMessage {
    /// Parse and normalize one text frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Self::from_envelope(&envelope)
    }

    /// Normalize an already decoded envelope
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ProtocolError> {
        let data = &envelope.data;

        match envelope.event.as_str() {
            "register-broadcaster" => {
                let payload = Payload::new("register-broadcaster", data);
                Ok(ClientMessage::Register {
                    id: payload.broadcaster_id("id")?,
                    name: payload.display_name("name")?,
                })
            }
            "unregister-broadcaster" => {
                let payload = Payload::new("unregister-broadcaster", data);
                Ok(ClientMessage::Unregister {
                    id: payload.require("id", payload.positional_broadcaster_id("id")?)?,
                })
            }
            "list-broadcasters" | "viewer-connect" => Ok(ClientMessage::ListBroadcasters),
            "connect-to-broadcaster" => {
                let payload = Payload::new("connect-to-broadcaster", data);
                Ok(ClientMessage::ConnectRequest {
                    broadcaster_id: payload.require(
                        "broadcasterId",
                        payload.positional_broadcaster_id("broadcasterId")?,
                    )?,
                })
            }
            "offer" => {
                let payload = Payload::new("offer", data);
                Ok(ClientMessage::Offer {
                    sdp: with_default_type(payload.require("sdp", payload.blob("sdp"))?, "offer"),
                    broadcaster_id: payload.broadcaster_id("broadcasterId")?,
                    target_viewer_id: payload
                        .require("targetViewerId", payload.connection_id("targetViewerId")?)?,
                })
            }
            "answer" => {
                let payload = Payload::new("answer", data);
                // The named field is authoritative; `target` is the legacy spelling
                let target = match payload.broadcaster_id("targetBroadcasterId")? {
                    Some(id) => Some(id),
                    None => payload.broadcaster_id("target")?,
                };

                Ok(ClientMessage::Answer {
                    sdp: with_default_type(payload.require("sdp", payload.blob("sdp"))?, "answer"),
                    target_broadcaster_id: payload.require("targetBroadcasterId", target)?,
                })
            }
            "ice-candidate" => {
                let payload = Payload::new("ice-candidate", data);
                let candidate = payload.require("candidate", payload.blob("candidate"))?;
                let target = if let Some(viewer) = payload.connection_id("targetViewerId")? {
                    IceTarget::Viewer(viewer)
                } else if let Some(broadcaster) = payload.broadcaster_id("targetBroadcasterId")? {
                    IceTarget::Broadcaster(broadcaster)
                } else {
                    return Err(payload.missing("targetViewerId|targetBroadcasterId"));
                };

                Ok(ClientMessage::IceCandidate {
                    candidate,
                    target,
                    broadcaster_id: payload.broadcaster_id("broadcasterId")?,
                })
            }
            "switch-camera" => {
                let payload = Payload::new("switch-camera", data);
                Ok(ClientMessage::SwitchCamera {
                    broadcaster_id: payload
                        .require("broadcasterId", payload.broadcaster_id("broadcasterId")?)?,
                })
            }
            other => Err(ProtocolError::UnknownEvent(other.to_owned())),
        }
    }

    /// Canonical event name, for logging
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientMessage::Register { .. } => "register-broadcaster",
            ClientMessage::Unregister { .. } => "unregister-broadcaster",
            ClientMessage::ListBroadcasters => "list-broadcasters",
            ClientMessage::ConnectRequest { .. } => "connect-to-broadcaster",
            ClientMessage::Offer { .. } => "offer",
            ClientMessage::Answer { .. } => "answer",
            ClientMessage::IceCandidate { .. } => "ice-candidate",
            ClientMessage::SwitchCamera { .. } => "switch-camera",
        }
    }
}

/// Field accessors over one envelope's `data`
struct Payload<'a> {
    event: &'static str,
    data: &'a Value,
}

impl<'a> Payload<'a> {
    fn new(event: &'static str, data: &'a Value) -> Self {
        Self { event, data }
    }

    /// Object member, with `null` treated as absent
    fn field(&self, name: &str) -> Option<&'a Value> {
        self.data
            .as_object()
            .and_then(|map| map.get(name))
            .filter(|v| !v.is_null())
    }

    fn string(&self, field: &'static str) -> Result<Option<&'a str>, ProtocolError> {
        match self.field(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(self.invalid(field, "expected a string".into())),
        }
    }

    fn broadcaster_id(&self, field: &'static str) -> Result<Option<BroadcasterId>, ProtocolError> {
        self.string(field)?
            .map(|raw| BroadcasterId::parse(raw).map_err(|e| self.invalid(field, e.to_string())))
            .transpose()
    }

    /// Like [`Self::broadcaster_id`], but also accepts the id as the whole payload
    fn positional_broadcaster_id(
        &self,
        field: &'static str,
    ) -> Result<Option<BroadcasterId>, ProtocolError> {
        match self.data {
            Value::String(raw) => BroadcasterId::parse(raw)
                .map(Some)
                .map_err(|e| self.invalid(field, e.to_string())),
            _ => self.broadcaster_id(field),
        }
    }

    fn connection_id(&self, field: &'static str) -> Result<Option<ConnectionId>, ProtocolError> {
        self.string(field)?
            .map(|raw| ConnectionId::parse(raw).map_err(|e| self.invalid(field, e.to_string())))
            .transpose()
    }

    fn display_name(&self, field: &'static str) -> Result<Option<String>, ProtocolError> {
        Ok(self
            .string(field)?
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| name.chars().take(MAX_NAME_CHARS).collect()))
    }

    /// Opaque payload; an empty string counts as absent
    fn blob(&self, field: &str) -> Option<Value> {
        self.field(field)
            .filter(|v| !matches!(v, Value::String(s) if s.is_empty()))
            .cloned()
    }

    fn require<T>(&self, field: &'static str, value: Option<T>) -> Result<T, ProtocolError> {
        value.ok_or_else(|| self.missing(field))
    }

    fn missing(&self, field: &'static str) -> ProtocolError {
        ProtocolError::MissingField {
            event: self.event,
            field,
        }
    }

    fn invalid(&self, field: &'static str, reason: String) -> ProtocolError {
        ProtocolError::InvalidField {
            event: self.event,
            field,
            reason,
        }
    }
}

/// Fill in the SDP `type` member when a client left it out
fn with_default_type(mut sdp: Value, kind: &str) -> Value {
    if let Value::Object(ref mut map) = sdp {
        map.entry("type")
            .or_insert_with(|| Value::String(kind.to_owned()));
    }
    sdp
}
