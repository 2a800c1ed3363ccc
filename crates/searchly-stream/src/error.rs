//! Error types for searchly-stream

use thiserror::Error;

/// Result type alias using searchly-stream Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the chat backend
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request or body read failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend answered with a non-success status before streaming began
    #[error("Connection failed with status {status}")]
    Connection { status: reqwest::StatusCode },
}
