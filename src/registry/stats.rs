//! Registry statistics and diagnostic snapshot structures

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Registry statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total_connections: usize,
    pub unique_users: usize,
}

/// One bound connection as seen by a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSummary {
    pub id: Uuid,
    pub connected_at: DateTime<Utc>,
    pub peer: Option<String>,
}

/// All connections of one user, taken under that user's shard lock
#[derive(Debug, Clone, Serialize)]
pub struct UserSessions {
    pub user_id: String,
    pub connections: Vec<ConnectionSummary>,
}

/// Whole-registry view for operational inspection.
///
/// Each `UserSessions` group is internally consistent; groups may come from
/// slightly different moments.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    pub taken_at: DateTime<Utc>,
    pub users: Vec<UserSessions>,
}

impl RegistrySnapshot {
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_connections: self.users.iter().map(|u| u.connections.len()).sum(),
            unique_users: self.users.len(),
        }
    }
}

impl fmt::Display for RegistrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        writeln!(
            f,
            "session registry at {}: {} users, {} connections",
            self.taken_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            stats.unique_users,
            stats.total_connections
        )?;

        for user in &self.users {
            writeln!(f, "  user {} ({})", user.user_id, user.connections.len())?;
            for conn in &user.connections {
                write!(
                    f,
                    "    connection {} since {}",
                    conn.id,
                    conn.connected_at.to_rfc3339_opts(SecondsFormat::Secs, true)
                )?;
                if let Some(peer) = &conn.peer {
                    write!(f, " from {}", peer)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot_renders_header_only() {
        let snapshot = RegistrySnapshot {
            taken_at: Utc::now(),
            users: vec![],
        };
        let text = snapshot.to_string();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("0 users, 0 connections"));
    }

    #[test]
    fn test_snapshot_groups_by_user() {
        let id = Uuid::new_v4();
        let snapshot = RegistrySnapshot {
            taken_at: Utc::now(),
            users: vec![UserSessions {
                user_id: "alice".to_string(),
                connections: vec![ConnectionSummary {
                    id,
                    connected_at: Utc::now(),
                    peer: Some("192.168.1.4:40000".to_string()),
                }],
            }],
        };

        assert_eq!(
            snapshot.stats(),
            RegistryStats {
                total_connections: 1,
                unique_users: 1
            }
        );

        let text = snapshot.to_string();
        assert!(text.contains("user alice (1)"));
        assert!(text.contains(&format!("connection {}", id)));
        assert!(text.contains("from 192.168.1.4:40000"));
    }
}
