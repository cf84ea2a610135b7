//! Unified error types for mcbench.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors surfaced before or during a run.
///
/// Provider failures are deliberately not represented here: they are handled
/// per-request inside the engine (see [`crate::providers::ProviderError`]) and
/// recorded in the error log rather than aborting the run.
#[derive(Debug, Error)]
pub enum McbenchError {
    #[error("invalid config: {0}")]
    Config(String),

    #[error("failed to parse config: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("dataset file not found: {0}")]
    DatasetNotFound(PathBuf),

    #[error("malformed dataset line {line} in {path}: {message}")]
    Dataset {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for McbenchError {
    fn from(err: figment::Error) -> Self {
        McbenchError::Figment(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, McbenchError>;
