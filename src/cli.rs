//! Command-line arguments of the router binary.

use std::path::PathBuf;

use clap::Parser;

/// Flags win over their environment variables.
#[derive(Debug, Parser)]
#[command(name = "federation-router", version)]
#[command(about = "Federated GraphQL router with hot-reloadable execution config", long_about = None)]
pub struct RouterArgs {
    /// Router configuration file (TOML).
    #[arg(long, env = "CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// KEY=VALUE file applied to the environment before configuration is read.
    #[arg(long = "override-env", env = "OVERRIDE_ENV")]
    pub override_env: Option<PathBuf>,
}
