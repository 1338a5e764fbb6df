//! WebRTC broadcast signaling relay
//!
//! Camera publishers ("broadcasters") and web viewers connect over
//! WebSocket and exchange SDP offers, answers and ICE candidates through
//! the relay. The relay keeps a registry of broadcasters with stable
//! monitor numbers, tracks their liveness, and forwards each signaling
//! message to exactly the peer it names.
//!
//! # Example
//!
//! ```no_run
//! use atmos_relay::{ServerConfig, SignalServer};
//!
//! #[tokio::main]
//! async fn main() -> atmos_relay::Result<()> {
//!     let server = SignalServer::new(ServerConfig::default());
//!     server.run().await
//! }
//! ```

pub mod error;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;
pub mod stats;

pub use error::{Error, Result};
pub use protocol::{ClientMessage, ServerEvent};
pub use registry::{BroadcasterId, ConnectionId, ConnectionRegistry, RegistryConfig};
pub use router::MessageRouter;
pub use server::{ServerConfig, SignalServer};
