//! Federated GraphQL router with hot-reloadable execution config.

pub mod admin;
pub mod cli;
pub mod config;
pub mod execution;
pub mod federation;
pub mod gateway;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::RouterConfig;
pub use http::HttpServer;
pub use lifecycle::{Gateway, LifecycleEngine, SignalGate};
