//! Connection registry implementation
//!
//! The directory of broadcasters known to the relay, keyed by their stable
//! id. It is owned by the relay event loop and mutated only from there, so
//! it carries no locking of its own.

use std::collections::HashMap;
use std::time::Instant;

use super::config::RegistryConfig;
use super::entry::{BroadcasterSession, Liveness};
use super::identity::{lowest_free_number, BroadcasterId, ConnectionId};

/// How a registration was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// No entry existed; a new one was created
    Created,
    /// A live entry was updated in place
    Refreshed,
    /// A dead entry inside its grace period came back
    Revived,
}

/// Result of [`ConnectionRegistry::register`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub id: BroadcasterId,
    pub monitor_number: u32,
    pub outcome: RegistrationOutcome,
}

/// Directory of broadcasters
pub struct ConnectionRegistry {
    /// Map of broadcaster id to entry
    entries: HashMap<BroadcasterId, BroadcasterSession>,

    /// Next registration sequence number
    next_seq: u64,

    /// Configuration
    config: RegistryConfig,
}

impl ConnectionRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            entries: HashMap::new(),
            next_seq: 0,
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a broadcaster
    ///
    /// Without an explicit id the transport id is used. A live entry with
    /// the same id is refreshed in place and keeps its monitor number. A
    /// dead entry still inside its grace period is revived with its old
    /// number, unless a live entry has taken that number since.
    pub fn register(
        &mut self,
        id: Option<BroadcasterId>,
        name: Option<String>,
        transport: &ConnectionId,
        now: Instant,
    ) -> Registration {
        let id = id.unwrap_or_else(|| BroadcasterId::from(transport));

        if let Some(liveness) = self.entries.get(&id).map(|e| e.liveness) {
            let monitor_number = match liveness {
                Liveness::Live => self.entries[&id].monitor_number,
                Liveness::Dead => {
                    let previous = self.entries[&id].monitor_number;
                    if self.number_taken_by_other(previous, &id) {
                        self.next_monitor_number()
                    } else {
                        previous
                    }
                }
            };

            if let Some(entry) = self.entries.get_mut(&id) {
                if name.is_some() {
                    entry.custom_name = name;
                }

                let outcome = match liveness {
                    Liveness::Live => {
                        if entry.transport != *transport {
                            tracing::info!(
                                broadcaster = %id,
                                from = %entry.transport,
                                to = %transport,
                                "Broadcaster moved to a new connection"
                            );
                            entry.transport = transport.clone();
                        }
                        entry.touch(now);
                        RegistrationOutcome::Refreshed
                    }
                    Liveness::Dead => {
                        entry.revive(transport.clone(), monitor_number, now);
                        RegistrationOutcome::Revived
                    }
                };

                tracing::info!(
                    broadcaster = %id,
                    connection = %transport,
                    monitor_number = monitor_number,
                    outcome = ?outcome,
                    "Broadcaster registered (existing entry)"
                );

                return Registration {
                    id,
                    monitor_number,
                    outcome,
                };
            }
        }

        let monitor_number = self.next_monitor_number();
        let seq = self.next_seq;
        self.next_seq += 1;

        self.entries.insert(
            id.clone(),
            BroadcasterSession::new(id.clone(), transport.clone(), name, monitor_number, seq, now),
        );

        tracing::info!(
            broadcaster = %id,
            connection = %transport,
            monitor_number = monitor_number,
            "Broadcaster registered (new entry)"
        );

        Registration {
            id,
            monitor_number,
            outcome: RegistrationOutcome::Created,
        }
    }

    /// Remove an entry immediately
    pub fn unregister(&mut self, id: &BroadcasterId) -> Option<BroadcasterSession> {
        let removed = self.entries.remove(id);

        if let Some(ref entry) = removed {
            tracing::info!(
                broadcaster = %id,
                monitor_number = entry.monitor_number,
                "Broadcaster unregistered"
            );
        }

        removed
    }

    /// Look up an entry, live or dead
    pub fn lookup(&self, id: &BroadcasterId) -> Option<&BroadcasterSession> {
        self.entries.get(id)
    }

    /// Look up an entry only if it is live
    pub fn lookup_live(&self, id: &BroadcasterId) -> Option<&BroadcasterSession> {
        self.entries.get(id).filter(|e| e.is_live())
    }

    /// Find the live entry carried by a connection
    ///
    /// Normally at most one exists. If a client registered twice under
    /// different ids, the earliest registration wins.
    pub fn find_by_transport(&self, transport: &ConnectionId) -> Option<&BroadcasterSession> {
        self.entries
            .values()
            .filter(|e| e.is_live() && e.transport == *transport)
            .min_by_key(|e| e.registered_seq)
    }

    /// Live entries ordered by monitor number, then registration order
    pub fn list_live(&self) -> Vec<&BroadcasterSession> {
        let mut live: Vec<&BroadcasterSession> =
            self.entries.values().filter(|e| e.is_live()).collect();
        live.sort_by_key(|e| (e.monitor_number, e.registered_seq));
        live
    }

    /// All entries, dead ones included, in the same order as [`Self::list_live`]
    pub fn list_all(&self) -> Vec<&BroadcasterSession> {
        let mut all: Vec<&BroadcasterSession> = self.entries.values().collect();
        all.sort_by_key(|e| (e.monitor_number, e.registered_seq));
        all
    }

    /// Smallest positive number not held by a live entry
    pub fn next_monitor_number(&self) -> u32 {
        lowest_free_number(
            self.entries
                .values()
                .filter(|e| e.is_live())
                .map(|e| e.monitor_number),
        )
    }

    /// Refresh the activity timestamp of a live entry
    pub fn touch(&mut self, id: &BroadcasterId, now: Instant) {
        if let Some(entry) = self.entries.get_mut(id).filter(|e| e.is_live()) {
            entry.touch(now);
        }
    }

    /// Mark every live entry carried by `transport` as dead
    ///
    /// Returns the ids that changed state, ordered by monitor number.
    /// Entries that were already dead are not reported again.
    pub fn mark_disconnected(&mut self, transport: &ConnectionId, now: Instant) -> Vec<BroadcasterId> {
        let mut affected: Vec<(u32, BroadcasterId)> = Vec::new();

        for entry in self.entries.values_mut() {
            if entry.is_live() && entry.transport == *transport {
                entry.mark_dead(now);
                affected.push((entry.monitor_number, entry.id.clone()));

                tracing::info!(
                    broadcaster = %entry.id,
                    connection = %transport,
                    grace_period_secs = self.config.reclaim_grace_period.as_secs(),
                    "Broadcaster disconnected, entering grace period"
                );
            }
        }

        affected.sort();
        affected.into_iter().map(|(_, id)| id).collect()
    }

    /// Remove dead entries whose grace period has run out
    ///
    /// Liveness is re-checked here, so an entry that was revived after it
    /// died is never removed.
    pub fn reclaim_expired(&mut self, now: Instant) -> Vec<BroadcasterId> {
        let grace = self.config.reclaim_grace_period;

        let expired: Vec<BroadcasterId> = self
            .entries
            .values()
            .filter(|e| match (e.liveness, e.disconnected_at) {
                (Liveness::Dead, Some(at)) => now.saturating_duration_since(at) >= grace,
                _ => false,
            })
            .map(|e| e.id.clone())
            .collect();

        for id in &expired {
            if let Some(entry) = self.entries.remove(id) {
                tracing::info!(
                    broadcaster = %id,
                    monitor_number = entry.monitor_number,
                    "Broadcaster reclaimed after grace period"
                );
            }
        }

        expired
    }

    /// Number of live entries
    pub fn live_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_live()).count()
    }

    /// Number of entries, dead ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn number_taken_by_other(&self, number: u32, id: &BroadcasterId) -> bool {
        self.entries
            .values()
            .any(|e| e.is_live() && e.monitor_number == number && e.id != *id)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
