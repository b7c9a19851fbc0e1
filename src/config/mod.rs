//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! --override-env file (optional)
//!     → env.rs (KEY=VALUE into the process environment)
//! router config file (TOML)
//!     → loader.rs (locate, parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated, immutable)
//!
//! Execution config file (JSON, see crate::execution):
//!     watcher.rs detects change
//!     → reload loop re-reads and compiles it
//!     → lifecycle engine swaps generations
//! ```
//!
//! # Design Decisions
//! - Router config is read once at startup; only the execution config reloads
//! - All fields have defaults to allow minimal configs
//! - Defaults read the environment, file values win over the environment
//! - Validation separates syntactic (serde) from semantic checks

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{resolve_config, ConfigError, ConfigOrigin, LoadedConfig};
pub use schema::{
    AdminConfig, ConcurrentReloadPolicy, ExecutionConfigSettings, LifecycleConfig,
    ListenerConfig, ObservabilityConfig, ReloadFailurePolicy, RouterConfig,
};
