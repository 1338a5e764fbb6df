//! Signaling server
//!
//! HTTP and WebSocket front end plus the relay event loop that owns all
//! broadcaster state.

pub mod config;
mod connection;
mod http;
pub mod listener;
pub mod relay;

pub use config::{parse_bind_addr, ServerConfig};
pub use listener::SignalServer;
pub use relay::{BroadcasterStatus, Relay, RelayCommand, RelayHandle, RelaySnapshot};
