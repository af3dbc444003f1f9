//! Gauge export through the registry-aware encoder
//!
//! Kept in its own test binary so no other test touches the global gauges.

use std::sync::Arc;

use tokio::sync::mpsc;

use chat_session_registry::metrics::encode_registry_metrics;
use chat_session_registry::registry::{ConnectionHandle, SessionRegistry};

fn gauge_value(output: &str, name: &str) -> Option<f64> {
    output
        .lines()
        .find_map(|line| line.strip_prefix(name)?.strip_prefix(' ')?.trim().parse().ok())
}

#[test]
fn test_gauges_follow_registry_without_diagnostics_task() {
    let registry = SessionRegistry::new();
    let mut conns = Vec::new();
    for user in ["alice", "alice", "alice", "bob"] {
        let (tx, _rx) = mpsc::channel(1);
        let handle = Arc::new(ConnectionHandle::new(tx));
        registry.bind(user, handle.clone());
        conns.push(handle);
    }

    let output = encode_registry_metrics(&registry).unwrap();
    assert_eq!(gauge_value(&output, "chat_registry_connections"), Some(4.0));
    assert_eq!(gauge_value(&output, "chat_registry_users"), Some(2.0));

    registry.unbind(conns[3].id);
    let output = encode_registry_metrics(&registry).unwrap();
    assert_eq!(gauge_value(&output, "chat_registry_connections"), Some(3.0));
    assert_eq!(gauge_value(&output, "chat_registry_users"), Some(1.0));
}
