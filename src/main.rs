use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tokio::sync::broadcast;

use chat_session_registry::config::Settings;
use chat_session_registry::tasks::DiagnosticsTask;
use chat_session_registry::telemetry;
use chat_session_registry::SessionRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing
    telemetry::init_logging(&settings.logging)?;
    tracing::info!("Configuration loaded");

    // One registry for the whole process; connection handlers receive clones of this Arc
    let registry = Arc::new(SessionRegistry::with_config(&settings.registry));
    tracing::info!(
        shard_amount = settings.registry.shard_amount,
        initial_capacity = settings.registry.initial_capacity,
        "Session registry initialized"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start diagnostics task in background
    let diagnostics = DiagnosticsTask::new(
        settings.diagnostics.clone(),
        registry.clone(),
        shutdown_tx.subscribe(),
    );
    let diagnostics_handle = tokio::spawn(diagnostics.run());

    shutdown_signal_handler().await;
    let _ = shutdown_tx.send(());

    tracing::info!("Waiting for background tasks to finish...");
    let _ = diagnostics_handle.await;

    let stats = registry.stats();
    tracing::info!(
        connections = stats.total_connections,
        users = stats.unique_users,
        "Session registry shutdown complete"
    );
    tracing::info!(dump = %registry.diagnostic_dump(), "Final session registry dump");
    Ok(())
}

async fn shutdown_signal_handler() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
