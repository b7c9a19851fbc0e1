//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! listener.rs (bind configured address)
//!     → axum::serve in http/server.rs
//! ```

pub mod listener;

pub use listener::{bind, ListenerError};
