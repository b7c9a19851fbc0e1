//! Configuration sources.
//!
//! A source supplies the initial execution config and turns change
//! notifications back into a fresh config. Notifications may be duplicated,
//! so a source must return the same content (and therefore the same
//! [`ConfigId`](crate::execution::ConfigId)) for the same file state.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::execution::config::ExecutionConfig;
use crate::execution::error::ConfigLoadError;

/// "The execution config changed" notification.
#[derive(Debug, Clone)]
pub struct ConfigChange {
    path: PathBuf,
    observed_at: Instant,
}

impl ConfigChange {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            observed_at: Instant::now(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn observed_at(&self) -> Instant {
        self.observed_at
    }
}

/// Supplies execution configs to the lifecycle engine.
pub trait ConfigSource: Send + Sync {
    /// Load the current config.
    fn load(&self) -> Result<ExecutionConfig, ConfigLoadError>;

    /// Dereference a change notification into a new config.
    fn reload(&self, _change: &ConfigChange) -> Result<ExecutionConfig, ConfigLoadError> {
        self.load()
    }
}

/// Reads the execution config from a JSON file.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<ExecutionConfig, ConfigLoadError> {
        let bytes = fs::read(&self.path).map_err(|source| ConfigLoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        ExecutionConfig::from_slice(&bytes)
    }
}
