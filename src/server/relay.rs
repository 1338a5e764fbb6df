//! Relay event loop
//!
//! One task owns the [`ConnectionRegistry`] and the table of open
//! connections. Connection tasks feed it [`RelayCommand`]s over a channel
//! and it handles them strictly one at a time, so reading and writing the
//! registry for one message can never interleave with another message. The
//! reclaim timer ticks inside the same loop.
//!
//! ```text
//!   [conn task] ──┐                       ┌──► outbound tx ──► [conn writer]
//!   [conn task] ──┼──► commands ──► Relay ┼──► outbound tx ──► [conn writer]
//!   [http]      ──┘    (mpsc)     (router)└──► outbound tx ──► [conn writer]
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::{Error, Result};
use crate::protocol::{ClientMessage, ServerEvent};
use crate::registry::{BroadcasterId, ConnectionId, ConnectionRegistry, RegistryConfig};
use crate::router::{Delivery, MessageRouter, Recipient};
use crate::stats::RelayStats;

/// Shortest reclaim tick the loop will run
const MIN_CLEANUP_INTERVAL: Duration = Duration::from_millis(1);

/// Work item for the relay loop
#[derive(Debug)]
pub enum RelayCommand {
    /// A transport connection opened
    Connect {
        connection: ConnectionId,
        outbound: mpsc::UnboundedSender<ServerEvent>,
    },
    /// A normalized message arrived on a connection
    Message {
        from: ConnectionId,
        message: ClientMessage,
    },
    /// A transport connection closed
    Disconnect { connection: ConnectionId },
    /// Read-only view for status endpoints
    Snapshot {
        reply: oneshot::Sender<RelaySnapshot>,
    },
}

/// One registry entry as reported by the debug endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcasterStatus {
    pub id: BroadcasterId,
    pub name: String,
    pub monitor_number: u32,
    pub connected: bool,
}

/// Consistent view of the relay state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelaySnapshot {
    pub connections: usize,
    pub live_broadcasters: usize,
    pub broadcasters: Vec<BroadcasterStatus>,
    pub stats: RelayStats,
}

/// Cheap, cloneable sender side of the relay loop
#[derive(Debug, Clone)]
pub struct RelayHandle {
    commands: mpsc::UnboundedSender<RelayCommand>,
}

impl RelayHandle {
    /// Announce a new connection and the queue its events go to
    pub fn connect(
        &self,
        connection: ConnectionId,
        outbound: mpsc::UnboundedSender<ServerEvent>,
    ) -> Result<()> {
        self.send(RelayCommand::Connect {
            connection,
            outbound,
        })
    }

    /// Hand over a message received on `from`
    pub fn message(&self, from: ConnectionId, message: ClientMessage) -> Result<()> {
        self.send(RelayCommand::Message { from, message })
    }

    /// Announce that a connection closed
    pub fn disconnect(&self, connection: ConnectionId) -> Result<()> {
        self.send(RelayCommand::Disconnect { connection })
    }

    /// Fetch a snapshot of the relay state
    pub async fn snapshot(&self) -> Result<RelaySnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::Snapshot { reply })?;
        rx.await.map_err(|_| Error::RelayClosed)
    }

    fn send(&self, command: RelayCommand) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::RelayClosed)
    }
}

/// The relay loop state
pub struct Relay {
    registry: ConnectionRegistry,
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>,
    stats: RelayStats,
    commands: mpsc::UnboundedReceiver<RelayCommand>,
}

impl Relay {
    /// Create a relay and the handle that feeds it
    pub fn new(config: RegistryConfig) -> (Self, RelayHandle) {
        let (tx, rx) = mpsc::unbounded_channel();

        let relay = Self {
            registry: ConnectionRegistry::with_config(config),
            connections: HashMap::new(),
            stats: RelayStats::new(),
            commands: rx,
        };

        (relay, RelayHandle { commands: tx })
    }

    /// Create a relay and run it on its own task
    pub fn spawn(config: RegistryConfig) -> (RelayHandle, JoinHandle<()>) {
        let (relay, handle) = Self::new(config);
        (handle, tokio::spawn(relay.run()))
    }

    /// Run until every handle is dropped
    pub async fn run(mut self) {
        let period = self.registry.config().cleanup_interval;
        if period < MIN_CLEANUP_INTERVAL {
            tracing::warn!(
                requested_ms = period.as_millis() as u64,
                "Cleanup interval too small, using {}ms",
                MIN_CLEANUP_INTERVAL.as_millis()
            );
        }
        let mut ticker = tokio::time::interval(period.max(MIN_CLEANUP_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command, Instant::now()),
                    None => break,
                },
                _ = ticker.tick() => self.reclaim(Instant::now()),
            }
        }

        tracing::debug!("Relay event loop stopped");
    }

    /// Apply one command
    pub fn handle(&mut self, command: RelayCommand, now: Instant) {
        match command {
            RelayCommand::Connect {
                connection,
                outbound,
            } => {
                if self.connections.insert(connection.clone(), outbound).is_none() {
                    self.stats.on_connect();
                }
                tracing::debug!(
                    connection = %connection,
                    open = self.connections.len(),
                    "Connection registered with relay"
                );
            }
            RelayCommand::Message { from, message } => {
                self.stats.messages_received += 1;
                tracing::debug!(connection = %from, event = message.event_name(), "Routing message");

                let deliveries = MessageRouter::new(&mut self.registry).route(&from, message, now);
                self.dispatch(deliveries);
            }
            RelayCommand::Disconnect { connection } => {
                if self.connections.remove(&connection).is_some() {
                    self.stats.on_disconnect();
                }

                let deliveries =
                    MessageRouter::new(&mut self.registry).transport_closed(&connection, now);
                self.dispatch(deliveries);
            }
            RelayCommand::Snapshot { reply } => {
                // Requester may have gone away; nothing to do then
                let _ = reply.send(self.snapshot());
            }
        }
    }

    /// Run one reclaim pass
    pub fn reclaim(&mut self, now: Instant) {
        let removed = MessageRouter::new(&mut self.registry).reclaim_expired(now);
        self.stats.broadcasters_reclaimed += removed.len() as u64;
    }

    fn dispatch(&mut self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            match delivery {
                Delivery {
                    recipient: Recipient::Connection(target),
                    event,
                } => self.send_to(&target, event),
                fanout => self.send_to_others(&fanout),
            }
        }
    }

    fn send_to(&mut self, target: &ConnectionId, event: ServerEvent) {
        let name = event.event_name();
        let sent = self
            .connections
            .get(target)
            .map(|tx| tx.send(event).is_ok())
            .unwrap_or(false);

        if sent {
            self.stats.events_delivered += 1;
        } else {
            self.stats.events_dropped += 1;
            tracing::warn!(
                connection = %target,
                event = name,
                "Target connection is not open, event dropped"
            );
        }
    }

    fn send_to_others(&mut self, delivery: &Delivery) {
        for (id, tx) in &self.connections {
            if delivery.reaches(id) && tx.send(delivery.event.clone()).is_ok() {
                self.stats.events_delivered += 1;
            }
        }
    }

    fn snapshot(&self) -> RelaySnapshot {
        RelaySnapshot {
            connections: self.connections.len(),
            live_broadcasters: self.registry.live_count(),
            broadcasters: self
                .registry
                .list_all()
                .into_iter()
                .map(|e| BroadcasterStatus {
                    id: e.id.clone(),
                    name: e.display_name(),
                    monitor_number: e.monitor_number,
                    connected: e.is_live(),
                })
                .collect(),
            stats: self.stats.clone(),
        }
    }
}
