//! Session event types

use crate::conversation::Message;

/// Events broadcast while a turn streams, for front-ends to render from.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A turn started; `message_id` is the pending assistant message.
    TurnStart { message_id: u64 },

    /// The assistant message changed (content or search progress).
    MessageUpdate { message: Message },

    /// The turn finished; carries the final assistant message. Also sent
    /// after a cancelled turn, with whatever partial content stands.
    TurnEnd { message: Message },

    /// The turn failed at the transport level.
    Error { message: String },
}

impl SessionEvent {
    /// Check if this event ends the turn
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::TurnEnd { .. } | SessionEvent::Error { .. }
        )
    }
}
