//! Fan-out delivery to a user's devices.
//!
//! The registry only answers "which connections"; this module pushes a frame
//! to each returned handle. A send to a closed connection is counted, not
//! acted on: unbinding is the networking layer's close path.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::time::timeout;
use uuid::Uuid;

use crate::config::DeliveryConfig;
use crate::metrics::DeliveryMetrics;
use crate::registry::{ConnectionHandle, Frame, SessionRegistry};

/// Outcome counts for one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub targets: usize,
    pub sent: usize,
    pub failed: usize,
    pub timed_out: usize,
}

enum SendOutcome {
    Sent,
    Failed,
    TimedOut,
}

/// Pushes frames to the connections the registry hands out
pub struct Delivery {
    config: DeliveryConfig,
}

impl Delivery {
    pub fn new(config: DeliveryConfig) -> Self {
        Self { config }
    }

    /// Replicate a frame to every device of `user_id` except `origin`
    pub async fn to_other_devices(
        &self,
        registry: &SessionRegistry,
        user_id: &str,
        origin: Uuid,
        frame: Frame,
    ) -> DeliveryReport {
        let targets = registry.fan_out_targets(user_id, origin);
        self.deliver(targets, frame).await
    }

    /// Deliver a frame to every device of `user_id`
    pub async fn to_user(
        &self,
        registry: &SessionRegistry,
        user_id: &str,
        frame: Frame,
    ) -> DeliveryReport {
        let targets = registry.list_connections(user_id);
        self.deliver(targets, frame).await
    }

    /// Mirror a frame received on `origin` to the sender's other devices.
    ///
    /// Returns `None` when `origin` is not bound to any user.
    pub async fn relay_from(
        &self,
        registry: &SessionRegistry,
        origin: Uuid,
        frame: Frame,
    ) -> Option<DeliveryReport> {
        let user_id = registry.resolve_user(origin)?;
        Some(self.to_other_devices(registry, &user_id, origin, frame).await)
    }

    /// Send to each target concurrently, in batches of `max_concurrent_sends`
    pub async fn deliver(&self, targets: Vec<Arc<ConnectionHandle>>, frame: Frame) -> DeliveryReport {
        let mut report = DeliveryReport {
            targets: targets.len(),
            ..Default::default()
        };
        DeliveryMetrics::record_targets(targets.len());

        if targets.is_empty() {
            return report;
        }

        let send_timeout = Duration::from_millis(self.config.send_timeout_ms);
        let batch_size = self.config.max_concurrent_sends.max(1);

        for batch in targets.chunks(batch_size) {
            let sends = batch.iter().map(|handle| {
                let frame = frame.clone();
                async move {
                    match timeout(send_timeout, handle.send(frame)).await {
                        Ok(Ok(())) => SendOutcome::Sent,
                        Ok(Err(_)) => {
                            tracing::debug!(
                                connection_id = %handle.id,
                                "Fan-out send failed, connection may be closed"
                            );
                            SendOutcome::Failed
                        }
                        Err(_) => {
                            tracing::debug!(
                                connection_id = %handle.id,
                                timeout_ms = self.config.send_timeout_ms,
                                "Fan-out send timed out"
                            );
                            SendOutcome::TimedOut
                        }
                    }
                }
            });

            for outcome in join_all(sends).await {
                match outcome {
                    SendOutcome::Sent => report.sent += 1,
                    SendOutcome::Failed => report.failed += 1,
                    SendOutcome::TimedOut => report.timed_out += 1,
                }
            }
        }

        DeliveryMetrics::record_sent(report.sent as u64);
        if report.failed > 0 {
            DeliveryMetrics::record_failed(report.failed as u64);
        }
        if report.timed_out > 0 {
            DeliveryMetrics::record_timeouts(report.timed_out as u64);
        }

        report
    }
}
