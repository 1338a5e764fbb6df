//! Addressed outbound events

use crate::protocol::ServerEvent;
use crate::registry::ConnectionId;

/// Who receives a delivery
#[derive(Debug, Clone, PartialEq)]
pub enum Recipient {
    /// Exactly one connection
    Connection(ConnectionId),
    /// Every open connection except the given one
    AllExcept(ConnectionId),
}

/// One event bound for one or more connections
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub recipient: Recipient,
    pub event: ServerEvent,
}

impl Delivery {
    /// Address a single connection
    pub fn to(connection: &ConnectionId, event: ServerEvent) -> Self {
        Self {
            recipient: Recipient::Connection(connection.clone()),
            event,
        }
    }

    /// Address everyone but `sender`
    pub fn to_others(sender: &ConnectionId, event: ServerEvent) -> Self {
        Self {
            recipient: Recipient::AllExcept(sender.clone()),
            event,
        }
    }

    /// Whether `connection` is among the recipients
    pub fn reaches(&self, connection: &ConnectionId) -> bool {
        match self.recipient {
            Recipient::Connection(ref target) => target == connection,
            Recipient::AllExcept(ref sender) => sender != connection,
        }
    }
}
