//! CLI error types.

use at_config::ConfigError;
use at_pipeline::PipelineError;
use at_registry::{AuthError, ResolveError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("{0}")]
    Resolve(#[from] ResolveError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}
