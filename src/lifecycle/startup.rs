//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the initial execution config
//! - Bind the listener
//! - Start the lifecycle engine and the HTTP server
//! - Start the reload loop when change notifications are wired up
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and nothing is left serving
//! - The listener is bound before the first instance is published
//! - Background tasks run under the current span and stop with the gate

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::watcher::ConfigWatcher;
use crate::config::{ExecutionConfigSettings, RouterConfig};
use crate::execution::{ConfigChange, ConfigSource};
use crate::http::HttpServer;
use crate::lifecycle::engine::{EngineSettings, LifecycleEngine};
use crate::lifecycle::error::{LifecycleError, StartupError};
use crate::lifecycle::reload::run_reload_loop;
use crate::lifecycle::signals::{ShutdownReason, SignalGate};
use crate::net;

/// A running router: engine, HTTP server and reload loop.
pub struct Gateway {
    pub(crate) engine: Arc<LifecycleEngine>,
    pub(crate) gate: SignalGate,
    pub(crate) local_addr: SocketAddr,
    pub(crate) server: JoinHandle<()>,
    pub(crate) reload: Option<JoinHandle<()>>,
    pub(crate) shutdown_delay: Duration,
}

impl Gateway {
    /// Bring the router up. On error nothing keeps running.
    pub async fn start(
        config: &RouterConfig,
        source: Arc<dyn ConfigSource>,
        changes: Option<mpsc::UnboundedReceiver<ConfigChange>>,
        gate: SignalGate,
    ) -> Result<Self, LifecycleError> {
        let initial = source.load().map_err(StartupError::Config)?;
        let (listener, local_addr) = net::bind(&config.listener)
            .await
            .map_err(StartupError::Listener)?;

        let engine = LifecycleEngine::start(initial, EngineSettings::from_config(&config.lifecycle))?;

        let http = HttpServer::new(config, Arc::clone(&engine));
        let server_gate = gate.clone();
        let server = tokio::spawn(
            async move {
                if let Err(e) = http.run(listener, server_gate.child_token()).await {
                    tracing::error!(error = %e, "HTTP server failed");
                    server_gate.trigger(ShutdownReason::StartupFailed);
                }
            }
            .in_current_span(),
        );

        let reload = changes.map(|changes| {
            tokio::spawn(
                run_reload_loop(
                    Arc::clone(&engine),
                    source,
                    changes,
                    config.lifecycle.on_reload_failure,
                    gate.clone(),
                )
                .in_current_span(),
            )
        });

        tracing::info!(
            address = %local_addr,
            hot_reload = reload.is_some(),
            "Router started"
        );

        Ok(Self {
            engine,
            gate,
            local_addr,
            server,
            reload,
            shutdown_delay: config.lifecycle.shutdown_delay(),
        })
    }

    pub fn engine(&self) -> &Arc<LifecycleEngine> {
        &self.engine
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn gate(&self) -> &SignalGate {
        &self.gate
    }
}

/// Watch `path` for writes when the settings ask for it.
///
/// The watcher handle must outlive the receiver's consumer.
pub fn watch_execution_config(
    settings: &ExecutionConfigSettings,
    path: &Path,
) -> Result<Option<(RecommendedWatcher, mpsc::UnboundedReceiver<ConfigChange>)>, notify::Error> {
    if !settings.watch {
        tracing::info!("Execution config watching disabled");
        return Ok(None);
    }
    let (watcher, changes) =
        ConfigWatcher::new(path, Duration::from_millis(settings.watch_interval_ms));
    let handle = watcher.run()?;
    tracing::info!(path = %path.display(), "Watching execution config for changes");
    Ok(Some((handle, changes)))
}
