//! Federated GraphQL router.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                   FEDERATION ROUTER                   │
//!                 │                                                       │
//!   Signals ──────┼─▶ SignalGate ──cancel──┐                              │
//!                 │                        ▼                              │
//!   execution ────┼─▶ ConfigWatcher ──▶ reload loop ──▶ LifecycleEngine   │
//!   config file   │                                      │ ArcSwap       │
//!                 │                                      ▼               │
//!   Client ───────┼─▶ http server ──acquire──▶ RouterInstance (gen N)    │
//!                 │   (trace, request id,       ├ pipeline (/graphql)    │
//!                 │    timeout, limits)         └ EntityDispatcher       │
//!                 │                                                       │
//!                 │   RouterInstance (gen N-1, draining until idle/grace) │
//!                 └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Exit status
//! - 0 after a signal or requested stop
//! - 1 on startup failure, initial config failure, or a reload failure under
//!   `on_reload_failure = "exit"`

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::Instrument;

use federation_router::cli::RouterArgs;
use federation_router::config::env::apply_env_file;
use federation_router::config::{resolve_config, ConfigOrigin, RouterConfig};
use federation_router::execution::FileConfigSource;
use federation_router::lifecycle::{watch_execution_config, Gateway, ShutdownReason, SignalGate};
use federation_router::observability::{init_logging, init_metrics, root_span};

fn main() -> ExitCode {
    let args = RouterArgs::parse();

    // Applied while still single threaded, before the runtime exists and
    // before the configuration is read so env-backed defaults see it.
    let applied = match args.override_env.as_deref().map(apply_env_file).transpose() {
        Ok(applied) => applied,
        Err(e) => {
            eprintln!("federation-router: {e}");
            return ExitCode::FAILURE;
        }
    };

    let loaded = match resolve_config(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("federation-router: could not load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("federation-router: could not start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&loaded.config.observability);
    let startup = async {
        tracing::info!("federation-router v{} starting", env!("CARGO_PKG_VERSION"));
        if let (Some(path), Some(count)) = (args.override_env.as_deref(), applied) {
            tracing::info!(path = %path.display(), variables = count, "Applied override env file");
        }
        match &loaded.origin {
            ConfigOrigin::Explicit(path) => {
                tracing::info!(path = %path.display(), "Using configuration file")
            }
            ConfigOrigin::DefaultFile(path) => {
                tracing::info!(path = %path.display(), "Using configuration file found in working directory")
            }
            ConfigOrigin::Defaults => tracing::info!("No configuration file, using defaults"),
        }
        tracing::info!("Values in the config file have higher priority than environment variables");

        run(loaded.config).await
    };

    ExitCode::from(runtime.block_on(startup.instrument(root_span())))
}

async fn run(config: RouterConfig) -> u8 {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_in_flight = config.listener.max_in_flight,
        request_timeout_secs = config.timeouts.request_secs,
        shutdown_delay_secs = config.lifecycle.shutdown_delay_secs,
        drain_grace_secs = config.lifecycle.drain_grace_secs,
        "Configuration loaded"
    );

    let gate = SignalGate::new();
    if let Err(e) = gate.install() {
        tracing::error!(error = %e, "Failed to install signal handlers");
        return 1;
    }

    let Some(path) = config.execution_config.path.clone() else {
        tracing::error!(
            "No execution config path configured (set execution_config.path or EXECUTION_CONFIG_PATH)"
        );
        gate.trigger(ShutdownReason::StartupFailed);
        return gate.exit_code();
    };

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let (watcher, changes) = match watch_execution_config(&config.execution_config, &path) {
        Ok(Some((watcher, changes))) => (Some(watcher), Some(changes)),
        Ok(None) => (None, None),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to watch execution config");
            gate.trigger(ShutdownReason::StartupFailed);
            return gate.exit_code();
        }
    };

    let source = Arc::new(FileConfigSource::new(path));
    let gateway = match Gateway::start(&config, source, changes, gate.clone()).await {
        Ok(gateway) => gateway,
        Err(e) => {
            tracing::error!(error = %e, "Could not start router");
            gate.trigger(ShutdownReason::StartupFailed);
            return gate.exit_code();
        }
    };

    let code = gateway.wait_for_shutdown().await;
    drop(watcher);
    code
}
