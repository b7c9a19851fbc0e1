//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber
//! - Pick the output format (JSON or human-readable)
//! - Provide the root span every log line of the router runs under
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - Initialization is idempotent so tests may call it repeatedly

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Component name attached to every log line.
pub const COMPONENT: &str = "federation-router";

fn default_filter(level: &str) -> String {
    format!("federation_router={level},tower_http={level}")
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.log_level)));

    let json = config.json_log.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
    });
    let text = (!config.json_log).then(tracing_subscriber::fmt::layer);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .try_init();
}

/// Root span carrying component and version.
pub fn root_span() -> tracing::Span {
    tracing::info_span!(
        "router",
        component = COMPONENT,
        version = env!("CARGO_PKG_VERSION")
    )
}
