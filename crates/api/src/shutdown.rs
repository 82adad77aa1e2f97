//! Graceful shutdown handling for the web server.

use std::time::Duration;

use tokio::task::JoinHandle;

use wayfarer_agent::format_uptime;

use crate::server::ServerState;

/// Shutdown timeout in seconds.
const SHUTDOWN_TIMEOUT: u64 = 30;

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Stop background work and log final figures.
pub async fn cleanup_resources(state: &ServerState, background: Vec<JoinHandle<()>>) {
    tracing::info!("Cleaning up resources...");

    // Sweeps and the bot loop hold no state worth flushing
    for task in background {
        task.abort();
        let _ = task.await;
    }

    let conversations = state.orchestrator.conversations().len().await;
    tracing::info!(
        conversations,
        "Shutdown complete. Active conversations: {}",
        conversations
    );

    let uptime = Duration::from_secs(state.uptime_secs());
    tracing::info!("Server uptime: {}", format_uptime(uptime));
}

/// Run cleanup, giving up after [`SHUTDOWN_TIMEOUT`] seconds.
pub async fn shutdown_with_timeout(state: &ServerState, background: Vec<JoinHandle<()>>) {
    match tokio::time::timeout(
        Duration::from_secs(SHUTDOWN_TIMEOUT),
        cleanup_resources(state, background),
    )
    .await
    {
        Ok(_) => {
            tracing::info!("Resources cleaned up successfully");
        }
        Err(_) => {
            tracing::warn!("Cleanup timed out after {} seconds", SHUTDOWN_TIMEOUT);
        }
    }
}
