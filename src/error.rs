//! Error taxonomy for the assistant core
//!
//! No error here is fatal to the process: the dispatcher turns model errors
//! into error replies, and storage errors are logged and skipped.

use thiserror::Error;

/// Failure inside the text-generation backend
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode model output: {0}")]
    Decode(String),
    #[error("prompt is empty after cleaning")]
    EmptyPrompt,
    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        ModelError::Request(err.to_string())
    }
}

/// Failure inside the knowledge store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid stored JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error for assistant operations
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("input is empty")]
    Validation,
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("configuration error: {0}")]
    Config(String),
}
