//! User -> connections index

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::types::ConnectionHandle;

/// Point-in-time view of one user's connections.
///
/// Writers replace the whole collection, so a snapshot stays valid and
/// unchanged while other threads bind or unbind.
pub type Connections = Arc<Vec<Arc<ConnectionHandle>>>;

/// Maps a user id to the ordered collection of its open connections
/// (multiple devices per user).
pub struct ForwardIndex {
    sessions: DashMap<String, Connections>,
}

impl ForwardIndex {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// `shard_amount` must be a power of two greater than one
    pub fn with_capacity_and_shard_amount(capacity: usize, shard_amount: usize) -> Self {
        Self {
            sessions: DashMap::with_capacity_and_shard_amount(capacity, shard_amount),
        }
    }

    /// Add a connection to a user's collection.
    ///
    /// Returns `false` when a connection with the same id is already present.
    pub fn put(&self, user_id: &str, handle: Arc<ConnectionHandle>) -> bool {
        match self.sessions.entry(user_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let current = entry.get();
                if current.iter().any(|c| c.id == handle.id) {
                    return false;
                }
                let mut next = Vec::with_capacity(current.len() + 1);
                next.extend(current.iter().cloned());
                next.push(handle);
                entry.insert(Arc::new(next));
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(vec![handle]));
                true
            }
        }
    }

    /// Remove one connection from a user's collection, dropping the user key
    /// when nothing is left.
    pub fn remove(&self, user_id: &str, connection_id: Uuid) -> bool {
        let Entry::Occupied(mut entry) = self.sessions.entry(user_id.to_string()) else {
            return false;
        };

        if !entry.get().iter().any(|c| c.id == connection_id) {
            return false;
        }

        let remaining: Vec<_> = entry
            .get()
            .iter()
            .filter(|c| c.id != connection_id)
            .cloned()
            .collect();

        if remaining.is_empty() {
            entry.remove();
        } else {
            entry.insert(Arc::new(remaining));
        }
        true
    }

    pub fn get(&self, user_id: &str) -> Option<Connections> {
        self.sessions.get(user_id).map(|c| Arc::clone(c.value()))
    }

    /// Snapshot of a user's connections minus `excluded`
    pub fn get_excluding(&self, user_id: &str, excluded: Uuid) -> Vec<Arc<ConnectionHandle>> {
        self.get(user_id)
            .map(|conns| conns.iter().filter(|c| c.id != excluded).cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, user_id: &str, connection_id: Uuid) -> bool {
        self.sessions
            .get(user_id)
            .is_some_and(|conns| conns.iter().any(|c| c.id == connection_id))
    }

    pub fn user_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn connection_count(&self) -> usize {
        self.sessions.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn users(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Clone every user's collection, one shard at a time.
    ///
    /// Each pair is internally consistent; the result as a whole is not a
    /// single atomic cut across users.
    pub fn snapshot_all(&self) -> Vec<(String, Connections)> {
        self.sessions
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }
}

impl Default for ForwardIndex {
    fn default() -> Self {
        Self::new()
    }
}
