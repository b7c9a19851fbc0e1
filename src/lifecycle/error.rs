//! Lifecycle errors.

use thiserror::Error;

use crate::execution::ConfigLoadError;
use crate::net::ListenerError;

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The process could not begin serving.
    #[error("startup failed: {0}")]
    Startup(#[source] StartupError),

    /// An execution config could not be loaded or built into an instance.
    #[error("execution config rejected: {0}")]
    ConfigLoad(#[from] ConfigLoadError),

    #[error("a reload is already in progress")]
    ConcurrentReload,

    /// The engine is not in a state that allows the operation.
    #[error("engine is {state}, not serving")]
    NotServing { state: &'static str },

    #[error("router is shutting down")]
    ShuttingDown,

    /// No instance accepted the request while a swap was in progress.
    #[error("no router instance accepted the request")]
    NotAccepting,

    /// Instances were still busy when the shutdown deadline passed.
    #[error("shutdown deadline passed with {undrained} instance(s) still draining")]
    ShutdownTimeout { undrained: usize },
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("initial execution config: {0}")]
    Config(#[from] ConfigLoadError),

    #[error("engine already started")]
    AlreadyStarted,
}

impl From<StartupError> for LifecycleError {
    fn from(e: StartupError) -> Self {
        LifecycleError::Startup(e)
    }
}
