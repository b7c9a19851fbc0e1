//! Configuration schema definitions.
//!
//! This module defines the router's process configuration. All types derive
//! Serde traits for deserialization from the TOML config file.
//!
//! Defaults consult the environment, so a value written in the file always
//! outranks the matching environment variable.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the federation router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address, request limits).
    pub listener: ListenerConfig,

    /// Where the compiled execution config lives and whether to watch it.
    pub execution_config: ExecutionConfigSettings,

    /// Reload and shutdown behavior.
    pub lifecycle: LifecycleConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3002").
    pub bind_address: String,

    /// Maximum concurrent requests across all generations (backpressure).
    pub max_in_flight: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: env_or("LISTEN_ADDR", "127.0.0.1:3002"),
            max_in_flight: 10_000,
        }
    }
}

/// Location of the execution config and watch settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionConfigSettings {
    /// Path to the compiled execution config (JSON).
    pub path: Option<PathBuf>,

    /// Reload automatically when the file is written.
    pub watch: bool,

    /// Poll interval for watcher backends that poll, in milliseconds.
    pub watch_interval_ms: u64,
}

impl Default for ExecutionConfigSettings {
    fn default() -> Self {
        Self {
            path: env::var_os("EXECUTION_CONFIG_PATH").map(PathBuf::from),
            watch: true,
            watch_interval_ms: 2000,
        }
    }
}

/// What to do when two reloads overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrentReloadPolicy {
    /// Wait for the running reload, then process this one.
    #[default]
    Queue,
    /// Fail the second reload immediately.
    Reject,
}

/// What to do when a reload cannot be read or built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReloadFailurePolicy {
    /// Log the failure and keep serving the previous generation.
    #[default]
    KeepPrevious,
    /// Shut the process down with a non-zero exit status.
    Exit,
}

/// Reload and shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Maximum time to drain after a termination signal, in seconds.
    pub shutdown_delay_secs: u64,

    /// Maximum time a superseded generation may keep serving, in seconds.
    pub drain_grace_secs: u64,

    pub concurrent_reload: ConcurrentReloadPolicy,

    pub on_reload_failure: ReloadFailurePolicy,
}

impl LifecycleConfig {
    pub fn shutdown_delay(&self) -> Duration {
        Duration::from_secs(self.shutdown_delay_secs)
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_secs(self.drain_grace_secs)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_delay_secs: env_parse("SHUTDOWN_DELAY", 60),
            drain_grace_secs: 30,
            concurrent_reload: ConcurrentReloadPolicy::default(),
            on_reload_failure: ReloadFailurePolicy::default(),
        }
    }
}

/// Timeout configuration for request handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable text.
    pub json_log: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: env_or("LOG_LEVEL", "info"),
            json_log: env_parse("JSON_LOG", false),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API under `/admin`.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Request hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 5 * 1024 * 1024, // 5MB
        }
    }
}

fn env_or(key: &str, fallback: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(fallback)
}
