//! Streaming chat session runtime.
//!
//! [`ChatSession`] owns the transport and the conversation, drives one
//! turn at a time on a spawned task, and broadcasts [`SessionEvent`]s for
//! front-ends. Cancellation is cooperative and silent: aborting a turn
//! leaves the partial assistant content standing and never takes the
//! error path.

use crate::conversation::Conversation;
use crate::error::{Error, Result};
use crate::events::SessionEvent;
use crate::transport::Transport;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Cloneable handle for poking the session from external code.
#[derive(Clone)]
pub struct SessionHandle {
    cancel: Arc<Mutex<CancellationToken>>,
    is_streaming: Arc<AtomicBool>,
}

impl SessionHandle {
    fn new() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            is_streaming: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Abort the in-flight turn, if any. No further events fire for it
    /// except a final `TurnEnd` with the partial message.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Whether a turn is currently streaming.
    pub fn is_streaming(&self) -> bool {
        self.is_streaming.load(Ordering::Acquire)
    }
}

/// A chat session: one conversation bound to one transport.
pub struct ChatSession {
    transport: Arc<dyn Transport>,
    conversation: Arc<Mutex<Conversation>>,
    event_tx: broadcast::Sender<SessionEvent>,
    handle: SessionHandle,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            transport,
            conversation: Arc::new(Mutex::new(Conversation::new())),
            event_tx,
            handle: SessionHandle::new(),
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Shared conversation state
    pub fn conversation(&self) -> Arc<Mutex<Conversation>> {
        Arc::clone(&self.conversation)
    }

    /// Get a cloneable handle for aborting from external code.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Abort the current turn
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Replace the draft input.
    pub fn set_draft(&self, text: impl Into<String>) {
        self.conversation.lock().draft = text.into();
    }

    /// Submit the current draft as a turn.
    pub fn send_draft(&self) -> Result<u64> {
        let text = std::mem::take(&mut self.conversation.lock().draft);
        self.send(text)
    }

    /// Drop all messages and the checkpoint token.
    pub fn reset(&self) {
        self.conversation.lock().clear();
    }

    /// Submit a user message and start streaming the assistant reply.
    ///
    /// Returns the id of the pending assistant message immediately; the
    /// stream runs on a spawned task and progress arrives via
    /// [`ChatSession::subscribe`]. Fails with [`Error::Busy`] while a
    /// turn is in flight.
    pub fn send(&self, text: impl Into<String>) -> Result<u64> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }
        if self.handle.is_streaming.swap(true, Ordering::AcqRel) {
            return Err(Error::Busy);
        }

        let (assistant_id, checkpoint) = {
            let mut conv = self.conversation.lock();
            conv.push_user(text.clone());
            let id = conv.begin_assistant();
            (id, conv.checkpoint_id.clone())
        };

        // Fresh token per turn, so aborting an old turn cannot cancel
        // this one.
        let cancel = CancellationToken::new();
        *self.handle.cancel.lock() = cancel.clone();

        let _ = self
            .event_tx
            .send(SessionEvent::TurnStart {
                message_id: assistant_id,
            });

        let transport = Arc::clone(&self.transport);
        let conversation = Arc::clone(&self.conversation);
        let event_tx = self.event_tx.clone();
        let is_streaming = Arc::clone(&self.handle.is_streaming);

        tokio::spawn(async move {
            run_turn(
                transport,
                conversation,
                event_tx,
                cancel,
                text,
                checkpoint,
                assistant_id,
            )
            .await;
            is_streaming.store(false, Ordering::Release);
        });

        Ok(assistant_id)
    }
}

/// Drive one streaming turn to completion, cancellation, or failure.
async fn run_turn(
    transport: Arc<dyn Transport>,
    conversation: Arc<Mutex<Conversation>>,
    event_tx: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
    text: String,
    checkpoint: Option<String>,
    assistant_id: u64,
) {
    let open = tokio::select! {
        _ = cancel.cancelled() => {
            finish_quietly(&conversation, &event_tx, assistant_id);
            return;
        }
        result = transport.open(&text, checkpoint.as_deref()) => result,
    };

    let mut stream = match open {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("failed to open chat stream: {e}");
            fail_turn(&conversation, &event_tx, assistant_id, &e.to_string());
            return;
        }
    };

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                // Cancellation is not an error; resolve quietly with the
                // partial content. Dropping the stream aborts the request.
                finish_quietly(&conversation, &event_tx, assistant_id);
                return;
            }
            item = stream.next() => match item {
                Some(Ok(event)) => {
                    let message = {
                        let mut conv = conversation.lock();
                        conv.apply(event);
                        conv.message(assistant_id).cloned()
                    };
                    if let Some(message) = message {
                        let _ = event_tx.send(SessionEvent::MessageUpdate { message });
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!("chat stream failed: {e}");
                    fail_turn(&conversation, &event_tx, assistant_id, &e.to_string());
                    return;
                }
                None => {
                    finish_quietly(&conversation, &event_tx, assistant_id);
                    return;
                }
            }
        }
    }
}

fn finish_quietly(
    conversation: &Mutex<Conversation>,
    event_tx: &broadcast::Sender<SessionEvent>,
    assistant_id: u64,
) {
    let message = {
        let mut conv = conversation.lock();
        conv.finish_stream();
        conv.message(assistant_id).cloned()
    };
    if let Some(message) = message {
        let _ = event_tx.send(SessionEvent::TurnEnd { message });
    }
}

fn fail_turn(
    conversation: &Mutex<Conversation>,
    event_tx: &broadcast::Sender<SessionEvent>,
    assistant_id: u64,
    detail: &str,
) {
    let message = {
        let mut conv = conversation.lock();
        conv.fail_stream(None);
        conv.message(assistant_id).cloned()
    };
    let _ = event_tx.send(SessionEvent::Error {
        message: detail.to_string(),
    });
    if let Some(message) = message {
        let _ = event_tx.send(SessionEvent::TurnEnd { message });
    }
}
