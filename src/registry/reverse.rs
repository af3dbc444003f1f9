//! Connection -> user index

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

/// Maps a connection id to the single user that owns it
pub struct ReverseIndex {
    owners: DashMap<Uuid, String>,
}

impl ReverseIndex {
    pub fn new() -> Self {
        Self {
            owners: DashMap::new(),
        }
    }

    pub fn with_capacity_and_shard_amount(capacity: usize, shard_amount: usize) -> Self {
        Self {
            owners: DashMap::with_capacity_and_shard_amount(capacity, shard_amount),
        }
    }

    /// Associate a connection with a user, returning any prior owner
    pub fn put(&self, connection_id: Uuid, user_id: &str) -> Option<String> {
        self.owners.insert(connection_id, user_id.to_string())
    }

    pub fn get(&self, connection_id: Uuid) -> Option<String> {
        self.owners.get(&connection_id).map(|owner| owner.value().clone())
    }

    pub fn remove(&self, connection_id: Uuid) -> Option<String> {
        self.owners.remove(&connection_id).map(|(_, owner)| owner)
    }

    /// Run `f` with the connection's slot exclusively locked.
    ///
    /// `f` receives the current owner and returns the new one; `None` clears
    /// the slot. Returns the previous owner. Other lookups of the same
    /// connection wait until `f` has returned.
    pub fn compute<F>(&self, connection_id: Uuid, f: F) -> Option<String>
    where
        F: FnOnce(Option<&str>) -> Option<String>,
    {
        match self.owners.entry(connection_id) {
            Entry::Occupied(mut entry) => {
                let next = f(Some(entry.get().as_str()));
                match next {
                    Some(owner) => Some(entry.insert(owner)),
                    None => Some(entry.remove()),
                }
            }
            Entry::Vacant(entry) => {
                if let Some(owner) = f(None) {
                    entry.insert(owner);
                }
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// All `(connection, owner)` pairs, one shard at a time
    pub fn entries(&self) -> Vec<(Uuid, String)> {
        self.owners
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }
}

impl Default for ReverseIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let index = ReverseIndex::new();
        let conn = Uuid::new_v4();

        assert_eq!(index.put(conn, "alice"), None);
        assert_eq!(index.get(conn).as_deref(), Some("alice"));
        assert_eq!(index.remove(conn).as_deref(), Some("alice"));
        assert_eq!(index.get(conn), None);
        assert_eq!(index.remove(conn), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_put_overwrites_stale_owner() {
        let index = ReverseIndex::new();
        let conn = Uuid::new_v4();

        index.put(conn, "alice");
        assert_eq!(index.put(conn, "bob").as_deref(), Some("alice"));
        assert_eq!(index.get(conn).as_deref(), Some("bob"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_compute_insert_replace_clear() {
        let index = ReverseIndex::new();
        let conn = Uuid::new_v4();

        let prev = index.compute(conn, |owner| {
            assert_eq!(owner, None);
            Some("alice".to_string())
        });
        assert_eq!(prev, None);

        let prev = index.compute(conn, |owner| {
            assert_eq!(owner, Some("alice"));
            Some("bob".to_string())
        });
        assert_eq!(prev.as_deref(), Some("alice"));

        let prev = index.compute(conn, |_| None);
        assert_eq!(prev.as_deref(), Some("bob"));
        assert!(index.get(conn).is_none());
    }

    #[test]
    fn test_compute_on_vacant_returning_none_leaves_no_entry() {
        let index = ReverseIndex::new();
        assert_eq!(index.compute(Uuid::new_v4(), |_| None), None);
        assert!(index.entries().is_empty());
    }
}
