//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use crate::registry::{RegistryStats, SessionRegistry};

use super::{
    DELIVERY_FAILED_TOTAL, DELIVERY_SENT_TOTAL, DELIVERY_TARGETS, DELIVERY_TIMEOUTS_TOTAL,
    REGISTRY_BINDS_TOTAL, REGISTRY_CONNECTIONS, REGISTRY_REBINDS_TOTAL, REGISTRY_UNBINDS_TOTAL,
    REGISTRY_USERS,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Refresh registry gauges from live stats, then encode all metrics
pub fn encode_registry_metrics(registry: &SessionRegistry) -> Result<String, prometheus::Error> {
    RegistryMetrics::observe(&registry.stats());
    encode_metrics()
}

/// Helper struct for recording registry metrics
pub struct RegistryMetrics;

impl RegistryMetrics {
    pub fn record_bind() {
        REGISTRY_BINDS_TOTAL.inc();
    }

    pub fn record_unbind() {
        REGISTRY_UNBINDS_TOTAL.inc();
    }

    pub fn record_rebind() {
        REGISTRY_REBINDS_TOTAL.inc();
    }

    /// Refresh gauges from a stats reading
    pub fn observe(stats: &RegistryStats) {
        REGISTRY_CONNECTIONS.set(stats.total_connections as i64);
        REGISTRY_USERS.set(stats.unique_users as i64);
    }
}

/// Helper struct for recording fan-out delivery metrics
pub struct DeliveryMetrics;

impl DeliveryMetrics {
    pub fn record_targets(count: usize) {
        DELIVERY_TARGETS.observe(count as f64);
    }

    pub fn record_sent(count: u64) {
        DELIVERY_SENT_TOTAL.inc_by(count);
    }

    pub fn record_failed(count: u64) {
        DELIVERY_FAILED_TOTAL.inc_by(count);
    }

    pub fn record_timeouts(count: u64) {
        DELIVERY_TIMEOUTS_TOTAL.inc_by(count);
    }
}
