//! Shutdown coordination.
//!
//! # Responsibilities
//! - Wait for the signal gate
//! - Drain the engine within the configured shutdown delay
//! - Stop the HTTP server and reload loop
//! - Report the exit status chosen by the winning shutdown reason
//!
//! # Design Decisions
//! - A shutdown timeout is logged, never escalated
//! - The server gets a short grace after the engine stops; then it is aborted

use std::time::Duration;

use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::signals::ShutdownReason;
use crate::lifecycle::startup::Gateway;

/// How long the HTTP server may take to close connections after the engine stopped.
const SERVER_CLOSE_GRACE: Duration = Duration::from_secs(1);

impl Gateway {
    /// Block until the gate closes, then shut down. Returns the exit status.
    pub async fn wait_for_shutdown(self) -> u8 {
        self.gate.cancelled().await;
        self.shutdown().await
    }

    /// Shut down now, bounded by the shutdown delay.
    pub async fn shutdown(self) -> u8 {
        let Gateway {
            engine,
            gate,
            server,
            reload,
            shutdown_delay,
            ..
        } = self;

        // Stops the listener and the reload loop if nobody has yet.
        gate.trigger(ShutdownReason::Requested);
        tracing::info!(
            reason = %gate.reason().map(|r| r.to_string()).unwrap_or_default(),
            deadline = ?shutdown_delay,
            "Shutting down"
        );

        match engine.shutdown(shutdown_delay).await {
            Ok(()) => {}
            Err(LifecycleError::ShutdownTimeout { undrained }) => {
                tracing::warn!(undrained, "Shutdown deadline passed, remaining work terminated");
            }
            Err(e) => tracing::error!(error = %e, "Engine shutdown failed"),
        }

        if let Some(reload) = reload {
            reload.abort();
        }
        let abort = server.abort_handle();
        if tokio::time::timeout(SERVER_CLOSE_GRACE, server).await.is_err() {
            tracing::warn!("HTTP server did not close in time, aborting");
            abort.abort();
        }

        let code = gate.exit_code();
        tracing::info!(exit_code = code, "Shutdown complete");
        code
    }
}
