//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum front router: middleware, health, admin)
//!     → request.rs (request ID assigned and propagated)
//!     → engine.acquire() → active generation's pipeline
//!     → response (x-request-id, x-router-generation)
//! ```

pub mod request;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
