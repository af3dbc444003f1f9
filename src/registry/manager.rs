use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::config::RegistryConfig;
use crate::metrics::RegistryMetrics;

use super::forward::ForwardIndex;
use super::reverse::ReverseIndex;
use super::stats::{ConnectionSummary, RegistrySnapshot, RegistryStats, UserSessions};
use super::types::ConnectionHandle;

/// Result of a `bind` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// The connection was unbound and is now owned by the user
    Bound,
    /// The connection was already owned by the same user; nothing changed
    AlreadyBound,
    /// The connection was owned by another user and has been moved
    Rebound { previous_user: String },
}

/// Tracks which connections belong to which user.
///
/// Both indices are updated under the connection's reverse-index slot lock,
/// so a lookup of that connection never sees half of a bind or unbind.
/// Lock order is always reverse slot, then forward shard.
pub struct SessionRegistry {
    /// user_id -> connections (multiple devices)
    forward: ForwardIndex,
    /// connection_id -> user_id
    reverse: ReverseIndex,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            forward: ForwardIndex::new(),
            reverse: ReverseIndex::new(),
        }
    }

    /// Build with the configured sizing.
    ///
    /// A `shard_amount` that is not a power of two greater than one is
    /// replaced by the default instead of panicking.
    pub fn with_config(config: &RegistryConfig) -> Self {
        let shard_amount = if config.shard_amount > 1 && config.shard_amount.is_power_of_two() {
            config.shard_amount
        } else {
            let fallback = RegistryConfig::default().shard_amount;
            tracing::warn!(
                shard_amount = config.shard_amount,
                fallback = fallback,
                "Invalid registry shard amount, using default"
            );
            fallback
        };

        Self {
            forward: ForwardIndex::with_capacity_and_shard_amount(
                config.initial_capacity,
                shard_amount,
            ),
            reverse: ReverseIndex::with_capacity_and_shard_amount(
                config.initial_capacity,
                shard_amount,
            ),
        }
    }

    /// Bind an authenticated connection to a user.
    ///
    /// Binding a connection that another user still owns moves it: it is
    /// taken out of the old user's collection before joining the new one.
    pub fn bind(&self, user_id: &str, handle: Arc<ConnectionHandle>) -> BindOutcome {
        let connection_id = handle.id;
        let mut outcome = BindOutcome::Bound;

        self.reverse.compute(connection_id, |owner| {
            match owner {
                Some(current) if current == user_id => outcome = BindOutcome::AlreadyBound,
                Some(current) => {
                    self.forward.remove(current, connection_id);
                    outcome = BindOutcome::Rebound {
                        previous_user: current.to_string(),
                    };
                }
                None => {}
            }
            self.forward.put(user_id, handle);
            Some(user_id.to_string())
        });

        match &outcome {
            BindOutcome::Bound => {
                RegistryMetrics::record_bind();
                tracing::info!(connection_id = %connection_id, user_id = %user_id, "Connection bound");
            }
            BindOutcome::AlreadyBound => {
                tracing::debug!(connection_id = %connection_id, user_id = %user_id, "Connection already bound");
            }
            BindOutcome::Rebound { previous_user } => {
                RegistryMetrics::record_rebind();
                tracing::warn!(
                    connection_id = %connection_id,
                    user_id = %user_id,
                    previous_user = %previous_user,
                    "Connection rebound without unbind, moved from previous owner"
                );
            }
        }

        outcome
    }

    /// Unbind a connection, returning the user it belonged to.
    ///
    /// Unbinding an unknown or already unbound connection is a no-op.
    pub fn unbind(&self, connection_id: Uuid) -> Option<String> {
        let previous = self.reverse.compute(connection_id, |owner| {
            if let Some(user_id) = owner {
                self.forward.remove(user_id, connection_id);
            }
            None
        });

        match &previous {
            Some(user_id) => {
                RegistryMetrics::record_unbind();
                tracing::info!(connection_id = %connection_id, user_id = %user_id, "Connection unbound");
            }
            None => {
                tracing::debug!(connection_id = %connection_id, "Unbind of unknown connection ignored");
            }
        }

        previous
    }

    /// Owner of a connection, if bound
    pub fn resolve_user(&self, connection_id: Uuid) -> Option<String> {
        self.reverse.get(connection_id)
    }

    /// Snapshot of a user's connections; empty when the user has none
    pub fn list_connections(&self, user_id: &str) -> Vec<Arc<ConnectionHandle>> {
        self.forward
            .get(user_id)
            .map(|conns| Vec::clone(&conns))
            .unwrap_or_default()
    }

    /// A user's other connections, for replicating a message to every device
    /// except the one it came from
    pub fn fan_out_targets(&self, user_id: &str, excluding: Uuid) -> Vec<Arc<ConnectionHandle>> {
        self.forward.get_excluding(user_id, excluding)
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.forward.get(user_id).is_some_and(|conns| !conns.is_empty())
    }

    /// Users with at least one bound connection
    pub fn online_users(&self) -> Vec<String> {
        self.forward.users()
    }

    /// All `(connection, owner)` pairs from the reverse index
    pub fn bound_connections(&self) -> Vec<(Uuid, String)> {
        self.reverse.entries()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_connections: self.forward.connection_count(),
            unique_users: self.forward.user_count(),
        }
    }

    /// Structured view of every user's connections.
    ///
    /// Per-user collections are cloned under their shard lock; sorting and
    /// building summaries happen after all locks are released.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let taken_at = Utc::now();
        let mut groups = self.forward.snapshot_all();
        groups.sort_by(|a, b| a.0.cmp(&b.0));

        let users = groups
            .into_iter()
            .map(|(user_id, conns)| UserSessions {
                user_id,
                connections: conns
                    .iter()
                    .map(|c| ConnectionSummary {
                        id: c.id,
                        connected_at: c.connected_at,
                        peer: c.peer.clone(),
                    })
                    .collect(),
            })
            .collect();

        RegistrySnapshot { taken_at, users }
    }

    /// Human-readable dump of the registry, for debugging only
    pub fn diagnostic_dump(&self) -> String {
        self.snapshot().to_string()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
