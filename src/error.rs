//! Classified engine failures

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to decode template {path:?}")]
    TemplateDecode { path: PathBuf },

    #[error("screen capture failed: {0}")]
    Capture(String),

    #[error("input injection failed: {0}")]
    Input(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
