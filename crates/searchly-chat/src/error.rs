//! Error types for searchly-chat

use thiserror::Error;

/// Result type alias using searchly-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when driving a chat session
#[derive(Error, Debug)]
pub enum Error {
    /// A turn is already streaming; the busy flag gates new submissions
    #[error("a response is already streaming")]
    Busy,

    /// The submitted message was empty after trimming
    #[error("message is empty")]
    EmptyMessage,
}
