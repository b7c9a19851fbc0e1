//! TCP listener setup.
//!
//! # Responsibilities
//! - Parse and bind the configured address
//! - Report bind failures as startup errors
//!
//! # Design Decisions
//! - Binding happens before the first instance is published, so a router
//!   that cannot listen never reports itself as serving
//! - Request backpressure lives in the HTTP stack (`max_in_flight`), not here

use std::net::{AddrParseError, SocketAddr};

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("invalid bind address `{address}`: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddrParseError,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind to the configured address. Returns the listener and the address it
/// actually bound (port 0 resolves to an ephemeral port).
pub async fn bind(config: &ListenerConfig) -> Result<(TcpListener, SocketAddr), ListenerError> {
    let address: SocketAddr =
        config
            .bind_address
            .parse()
            .map_err(|source| ListenerError::InvalidAddress {
                address: config.bind_address.clone(),
                source,
            })?;

    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| ListenerError::Bind { address, source })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind { address, source })?;

    tracing::info!(
        address = %local_addr,
        max_in_flight = config.max_in_flight,
        "Listener bound"
    );
    Ok((listener, local_addr))
}
