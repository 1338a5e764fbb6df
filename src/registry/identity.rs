//! Identity types
//!
//! Connections are addressed by an opaque id assigned at upgrade time.
//! Broadcasters carry a caller-chosen id that survives reconnects, and a
//! small display number that is recomputed from the live set on every
//! assignment.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::RegistryError;

/// Longest accepted identifier, in bytes
pub const MAX_ID_LEN: usize = 128;

/// Opaque per-connection identifier assigned by the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Wrap an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parse an identifier received from a client
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        validate(raw).map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable broadcaster identifier
///
/// Either supplied by the publishing app (so it survives app restarts) or
/// defaulted to the id of the connection that registered it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BroadcasterId(String);

impl BroadcasterId {
    /// Parse an identifier received from a client
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        validate(raw).map(|id| Self(id.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&ConnectionId> for BroadcasterId {
    fn from(connection: &ConnectionId) -> Self {
        Self(connection.0.clone())
    }
}

impl fmt::Display for BroadcasterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate(raw: &str) -> Result<&str, RegistryError> {
    let id = raw.trim();

    if id.is_empty() {
        return Err(RegistryError::EmptyId);
    }
    if id.len() > MAX_ID_LEN {
        return Err(RegistryError::IdTooLong(id.len()));
    }
    if id.chars().any(char::is_control) {
        return Err(RegistryError::InvalidCharacters);
    }

    Ok(id)
}

/// Smallest positive number not present in `taken`
pub fn lowest_free_number<I>(taken: I) -> u32
where
    I: IntoIterator<Item = u32>,
{
    let taken: HashSet<u32> = taken.into_iter().collect();

    let mut candidate = 1;
    while taken.contains(&candidate) {
        candidate += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_free_number_empty() {
        assert_eq!(lowest_free_number(Vec::new()), 1);
    }

    #[test]
    fn test_lowest_free_number_fills_gap() {
        assert_eq!(lowest_free_number(vec![1, 3, 4]), 2);
        assert_eq!(lowest_free_number(vec![2, 3]), 1);
        assert_eq!(lowest_free_number(vec![3, 1, 2]), 4);
    }

    #[test]
    fn test_broadcaster_id_trims() {
        let id = BroadcasterId::parse("  cam-1 ").unwrap();
        assert_eq!(id.as_str(), "cam-1");
    }

    #[test]
    fn test_broadcaster_id_rejects_bad_input() {
        assert!(matches!(BroadcasterId::parse("   "), Err(RegistryError::EmptyId)));
        assert!(matches!(
            BroadcasterId::parse(&"x".repeat(MAX_ID_LEN + 1)),
            Err(RegistryError::IdTooLong(_))
        ));
        assert!(matches!(
            BroadcasterId::parse("cam\u{0}1"),
            Err(RegistryError::InvalidCharacters)
        ));
    }

    #[test]
    fn test_generated_connection_ids_differ() {
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();

        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_broadcaster_id_from_connection() {
        let connection = ConnectionId::new("sock-9");
        assert_eq!(BroadcasterId::from(&connection).as_str(), "sock-9");
    }
}
