//! searchly-chat: conversation state and streaming session runtime
//!
//! This crate folds wire events from searchly-stream into conversation
//! state (messages, per-message search progress, the checkpoint token)
//! and drives streaming turns with cooperative cancellation.

pub mod conversation;
pub mod error;
pub mod events;
pub mod session;
pub mod transport;

pub use conversation::{
    CONNECTION_ERROR_TEXT, Conversation, Message, Role, SearchInfo, SearchStage,
};
pub use error::{Error, Result};
pub use events::SessionEvent;
pub use session::{ChatSession, SessionHandle};
pub use transport::{HttpTransport, Transport};
