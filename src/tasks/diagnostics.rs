use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::DiagnosticsConfig;
use crate::metrics::RegistryMetrics;
use crate::registry::SessionRegistry;

/// Background task that periodically reports registry state
pub struct DiagnosticsTask {
    config: DiagnosticsConfig,
    registry: Arc<SessionRegistry>,
    shutdown: broadcast::Receiver<()>,
}

impl DiagnosticsTask {
    pub fn new(
        config: DiagnosticsConfig,
        registry: Arc<SessionRegistry>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            registry,
            shutdown,
        }
    }

    /// Run until a shutdown signal arrives
    pub async fn run(mut self) {
        if self.config.interval_secs == 0 {
            tracing::info!("Diagnostics task disabled");
            return;
        }

        let mut timer = tokio::time::interval(Duration::from_secs(self.config.interval_secs));
        // Skip immediate first tick
        timer.tick().await;

        tracing::info!(
            interval_secs = self.config.interval_secs,
            "Diagnostics task started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Diagnostics task received shutdown signal");
                    break;
                }
                _ = timer.tick() => {
                    self.report();
                }
            }
        }

        tracing::info!("Diagnostics task stopped");
    }

    /// Log stats and refresh gauges; the full dump only at debug level
    pub fn report(&self) {
        let stats = self.registry.stats();
        RegistryMetrics::observe(&stats);

        tracing::info!(
            connections = stats.total_connections,
            users = stats.unique_users,
            "Session registry stats"
        );

        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(dump = %self.registry.diagnostic_dump(), "Session registry dump");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConnectionHandle;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_diagnostics_task_shutdown() {
        let config = DiagnosticsConfig { interval_secs: 1 };
        let registry = Arc::new(SessionRegistry::new());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = DiagnosticsTask::new(config, registry, shutdown_rx);
        let handle = tokio::spawn(task.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Task should complete")
            .expect("Task should not panic");
    }

    #[tokio::test]
    async fn test_disabled_task_returns_immediately() {
        let config = DiagnosticsConfig { interval_secs: 0 };
        let registry = Arc::new(SessionRegistry::new());
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = DiagnosticsTask::new(config, registry, shutdown_rx);
        tokio::time::timeout(Duration::from_secs(1), task.run())
            .await
            .expect("Disabled task should return");
    }

    #[test]
    fn test_report_with_bound_connections() {
        let registry = Arc::new(SessionRegistry::new());
        let (tx, _rx) = mpsc::channel(1);
        registry.bind("alice", Arc::new(ConnectionHandle::new(tx)));

        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = DiagnosticsTask::new(DiagnosticsConfig::default(), registry, shutdown_rx);
        task.report();
    }
}
