//! Protocol error types

use thiserror::Error;

/// Reasons an inbound frame is rejected at the boundary
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame is not a JSON envelope
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),

    /// Envelope names an event the relay does not handle
    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    /// A routing field is absent
    #[error("{event}: missing required field '{field}'")]
    MissingField {
        event: &'static str,
        field: &'static str,
    },

    /// A routing field has the wrong shape
    #[error("{event}: invalid field '{field}': {reason}")]
    InvalidField {
        event: &'static str,
        field: &'static str,
        reason: String,
    },
}
