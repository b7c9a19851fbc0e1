//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for hangup, terminate, quit and interrupt
//! - Fold OS signals and internal stop triggers into one cancellation
//! - Remember why the router is stopping so `main` can pick the exit status
//!
//! # Design Decisions
//! - The first trigger wins; later ones only cancel an already cancelled token
//! - Kill cannot be intercepted on any platform and is left to the OS
//! - Long-running tasks receive the gate (or a child token) explicitly

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Why the router is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// An OS signal, by name.
    Signal(&'static str),
    StartupFailed,
    ReloadFailed,
    /// Explicit stop from inside the process.
    Requested,
}

impl ShutdownReason {
    /// Process exit status for this reason.
    pub fn exit_code(&self) -> u8 {
        match self {
            ShutdownReason::Signal(_) | ShutdownReason::Requested => 0,
            ShutdownReason::StartupFailed | ShutdownReason::ReloadFailed => 1,
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "signal {name}"),
            ShutdownReason::StartupFailed => f.write_str("startup failed"),
            ShutdownReason::ReloadFailed => f.write_str("reload failed"),
            ShutdownReason::Requested => f.write_str("requested"),
        }
    }
}

/// Single cancellable lifecycle context for the whole process.
#[derive(Debug, Clone, Default)]
pub struct SignalGate {
    token: CancellationToken,
    reason: Arc<OnceLock<ShutdownReason>>,
}

impl SignalGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the context. Returns true if this call decided the reason.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        if first {
            tracing::info!(reason = %reason, "Shutdown triggered");
        } else {
            tracing::debug!(reason = %reason, "Shutdown already triggered, ignoring");
        }
        self.token.cancel();
        first
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Token cancelled together with the gate.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    /// Exit status implied by the winning reason (0 if never triggered).
    pub fn exit_code(&self) -> u8 {
        self.reason().map_or(0, |reason| reason.exit_code())
    }

    /// Register OS signal handlers and spawn the task translating them.
    #[cfg(unix)]
    pub fn install(&self) -> std::io::Result<JoinHandle<()>> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut hangup = signal(SignalKind::hangup())?;
        let mut terminate = signal(SignalKind::terminate())?;
        let mut quit = signal(SignalKind::quit())?;
        let mut interrupt = signal(SignalKind::interrupt())?;
        tracing::debug!("Signal handlers installed (SIGKILL cannot be intercepted)");

        let gate = self.clone();
        Ok(tokio::spawn(async move {
            let name = tokio::select! {
                _ = hangup.recv() => "SIGHUP",
                _ = terminate.recv() => "SIGTERM",
                _ = quit.recv() => "SIGQUIT",
                _ = interrupt.recv() => "SIGINT",
                _ = gate.cancelled() => return,
            };
            tracing::info!(signal = name, "Received signal");
            gate.trigger(ShutdownReason::Signal(name));
        }))
    }

    #[cfg(not(unix))]
    pub fn install(&self) -> std::io::Result<JoinHandle<()>> {
        let gate = self.clone();
        Ok(tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                        return;
                    }
                }
                _ = gate.cancelled() => return,
            }
            tracing::info!(signal = "ctrl_c", "Received signal");
            gate.trigger(ShutdownReason::Signal("ctrl_c"));
        }))
    }
}
