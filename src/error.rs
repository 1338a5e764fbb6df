//! Crate-level error types
//!
//! Only startup and plumbing failures live here. Malformed or misaddressed
//! signaling never becomes an `Error`: it is logged and dropped where it is
//! found.

use thiserror::Error;

use crate::protocol::ProtocolError;

#[derive(Debug, Error)]
pub enum Error {
    /// Socket or filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The relay event loop is no longer running
    #[error("relay event loop has shut down")]
    RelayClosed,

    /// Inbound frame could not be normalized
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

pub type Result<T> = std::result::Result<T, Error>;
