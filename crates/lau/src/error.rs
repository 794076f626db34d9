//! CLI error types.

use lau_build::BuildError;
use lau_config::ConfigError;
use lau_server::ServerError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Server(#[from] ServerError),

    #[error("{0}")]
    Build(#[from] BuildError),

    #[error("Failed to start runtime: {0}")]
    Runtime(std::io::Error),
}
