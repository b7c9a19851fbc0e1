//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Invalid override env file {path}, line {line}: {reason}")]
    OverrideEnv {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Override env file {path} must be applied before the async runtime starts")]
    RuntimeStarted { path: PathBuf },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Where the loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Path given on the command line or via `CONFIG_PATH`.
    Explicit(PathBuf),
    /// `config.toml` found in the working directory.
    DefaultFile(PathBuf),
    /// No file; built-in defaults and environment only.
    Defaults,
}

/// A validated configuration together with its origin.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: RouterConfig,
    pub origin: ConfigOrigin,
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RouterConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: RouterConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Resolve the config file to use and load it.
///
/// An explicit path must exist. Without one, `config.toml` in the working
/// directory is used when present, otherwise defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    if let Some(path) = explicit {
        return Ok(LoadedConfig {
            config: load_config(path)?,
            origin: ConfigOrigin::Explicit(path.to_path_buf()),
        });
    }

    let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default_path.is_file() {
        return Ok(LoadedConfig {
            config: load_config(&default_path)?,
            origin: ConfigOrigin::DefaultFile(default_path),
        });
    }

    let config = RouterConfig::default();
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(LoadedConfig {
        config,
        origin: ConfigOrigin::Defaults,
    })
}
