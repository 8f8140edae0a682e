//! Replay errors.

use inkslate_core::{ConfigError, LayerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Usage: inkslate-replay <script.json> [--document]")]
    Usage,
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid script JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Step {step}: {source}")]
    Layer {
        step: usize,
        #[source]
        source: LayerError,
    },
}
