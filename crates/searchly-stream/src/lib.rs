//! searchly-stream: wire protocol layer for the Searchly chat backend
//!
//! This crate opens the `chat_stream` SSE endpoint, frames `data:` lines
//! out of the chunked response body, and decodes them into typed
//! [`StreamEvent`]s. Conversation state lives one layer up in
//! searchly-chat.

pub mod client;
pub mod error;
pub mod events;
pub mod framer;

pub use client::{ChatClient, ChatEventStream};
pub use error::{Error, Result};
pub use events::{StreamEvent, UrlList};
pub use framer::SseFramer;
