//! Execution config load errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or compiling an execution config.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("could not read execution config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("execution config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("execution config is invalid: {}", .0.join("; "))]
    Invalid(Vec<String>),
}
