//! Broadcaster registry
//!
//! The registry is the directory of camera publishers the relay knows
//! about. Viewers never appear here: they are addressed purely by their
//! connection id for as long as that connection stays open.
//!
//! # Lifecycle
//!
//! ```text
//!   register ──► Live ──(transport closed)──► Dead ──(grace period)──► removed
//!                 ▲  │                          │
//!                 │  └──(unregister)──► removed │
//!                 └────────(register again)─────┘
//! ```
//!
//! Monitor numbers are recomputed from the live set on every assignment,
//! so a number vacated by a dead broadcaster is handed to the next
//! newcomer. A dead broadcaster that comes back keeps its old number when
//! it is still free.

pub mod config;
pub mod entry;
pub mod error;
pub mod identity;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{BroadcasterSession, BroadcasterSummary, Liveness};
pub use error::RegistryError;
pub use identity::{BroadcasterId, ConnectionId};
pub use store::{ConnectionRegistry, Registration, RegistrationOutcome};
