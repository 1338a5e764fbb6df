//! Signaling wire protocol
//!
//! This module provides:
//! - The JSON envelope clients and the relay exchange
//! - Normalization of inbound envelopes into typed messages
//! - Outbound event encoding
//!
//! SDP and ICE candidate payloads are opaque: the relay checks only that
//! they are present and forwards them verbatim.

pub mod error;
pub mod inbound;
pub mod outbound;

pub use error::ProtocolError;
pub use inbound::{ClientMessage, Envelope, IceTarget};
pub use outbound::ServerEvent;
