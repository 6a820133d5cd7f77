//! CLI error types.

use std::path::PathBuf;

use ditaa_config::ConfigError;
use ditaa_diagrams::DiagramError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Diagram(#[from] DiagramError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{}: invalid front matter: {message}", .path.display())]
    FrontMatter { path: PathBuf, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("{failed} of {total} diagrams failed to render")]
    RenderFailed { failed: usize, total: usize },
}
