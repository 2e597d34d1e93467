//! Signal handling for graceful termination.

use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// Resolves on SIGINT or SIGTERM.
///
/// A handler that fails to install is logged and treated as never firing,
/// so the other signal still stops the server.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}

/// Runs `server` until it finishes, allowing it `timeout` to drain once
/// `signal` fires.
///
/// `server` is expected to stop accepting on the same signal (through
/// `with_graceful_shutdown`); this only bounds how long in-flight requests
/// may take.
pub async fn run_until_drained<F, S, E>(server: F, signal: S, timeout: Duration) -> Result<(), E>
where
    F: std::future::Future<Output = Result<(), E>>,
    S: std::future::Future<Output = ()>,
{
    tokio::pin!(server);
    tokio::pin!(signal);

    tokio::select! {
        result = &mut server => return result,
        () = &mut signal => {}
    }

    match tokio::time::timeout(timeout, server).await {
        Ok(result) => {
            info!("Shutdown complete");
            result
        }
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "Shutdown timeout reached, dropping connections");
            Ok(())
        }
    }
}
