//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load execution config → Bind listener → Engine::start → Serve
//!
//! Reload (reload.rs):
//!     ConfigChange → begin_reload → source.reload → activate
//!     → previous generation drains (engine.rs)
//!
//! Shutdown (shutdown.rs):
//!     SignalGate cancelled → stop accepting → drain (bounded) → exit status
//!
//! Signals (signals.rs):
//!     SIGHUP/SIGTERM/SIGQUIT/SIGINT → SignalGate
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then listener, then serving
//! - Ordered shutdown: stop accept, drain, terminate leftovers
//! - Shutdown has a deadline; forced termination after it

pub mod engine;
pub mod error;
pub mod reload;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use engine::{ActiveRequest, EngineSettings, EngineState, LifecycleEngine, ReloadOutcome};
pub use error::{LifecycleError, StartupError};
pub use reload::{handle_change, run_reload_loop};
pub use signals::{ShutdownReason, SignalGate};
pub use startup::{watch_execution_config, Gateway};
