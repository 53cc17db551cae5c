use std::path::PathBuf;

/// Core error type for the monitor.
///
/// Adapter crates map their specific errors into this type so the pipeline can
/// log and carry on (one destination or one chat failing never stops the loop).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid history export: {path}: {reason}")]
    InvalidExport { path: PathBuf, reason: String },

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
