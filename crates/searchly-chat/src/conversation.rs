//! Conversation state: messages, search progress, checkpoint token.

use searchly_stream::StreamEvent;
use serde::{Deserialize, Serialize};

/// User-facing text for transport-level failures.
pub const CONNECTION_ERROR_TEXT: &str = "Connection error, please try again";

const SEARCH_ERROR_FALLBACK: &str = "Search failed";

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Search progress stages, in the order the backend reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStage {
    Searching,
    Reading,
    Writing,
    Error,
}

/// Web-search progress attached to one assistant message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchInfo {
    /// Stage labels in arrival order; append-only within a turn.
    pub stages: Vec<SearchStage>,
    pub query: String,
    /// Result URLs; replaced wholesale when results arrive.
    pub urls: Vec<String>,
    pub error: Option<String>,
}

/// One conversation entry.
///
/// User messages are complete on creation. Assistant messages start empty
/// with `loading = true` and are mutated in place by the fold until the
/// stream ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    pub content: String,
    pub loading: bool,
    pub search: Option<SearchInfo>,
    /// Creation time, Unix millis
    pub timestamp: i64,
}

impl Message {
    fn user(id: u64, content: String) -> Self {
        Self {
            id,
            role: Role::User,
            content,
            loading: false,
            search: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    fn assistant_pending(id: u64) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: String::new(),
            loading: true,
            search: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// A single in-memory conversation.
///
/// At most one stream is in flight at a time; `busy` gates new
/// submissions. The checkpoint token is opaque and handed back to the
/// server on every request to resume its workflow state.
#[derive(Debug, Default)]
pub struct Conversation {
    pub messages: Vec<Message>,
    /// Current draft input
    pub draft: String,
    pub checkpoint_id: Option<String>,
    pub busy: bool,
    next_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Record a submitted user message; immutable from here on.
    pub fn push_user(&mut self, content: impl Into<String>) -> u64 {
        let id = self.next_id();
        self.messages.push(Message::user(id, content.into()));
        id
    }

    /// Create the empty assistant message the stream folds into and mark
    /// the conversation busy.
    pub fn begin_assistant(&mut self) -> u64 {
        let id = self.next_id();
        self.messages.push(Message::assistant_pending(id));
        self.busy = true;
        id
    }

    pub fn message(&self, id: u64) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// The assistant message currently receiving the stream, if any.
    fn active_assistant(&mut self) -> Option<&mut Message> {
        self.messages
            .last_mut()
            .filter(|m| m.role == Role::Assistant)
    }

    fn active_search(&mut self) -> Option<&mut SearchInfo> {
        self.active_assistant().and_then(|m| m.search.as_mut())
    }

    /// Fold one stream event into the conversation, strictly in arrival
    /// order. Search events with no active `SearchInfo` are no-ops.
    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Checkpoint { checkpoint_id } => {
                self.checkpoint_id = Some(checkpoint_id);
            }
            StreamEvent::Content { content } => {
                if content.is_empty() {
                    return;
                }
                if let Some(msg) = self.active_assistant() {
                    msg.content.push_str(&content);
                    msg.loading = false;
                }
            }
            StreamEvent::SearchStart { query } => {
                if let Some(msg) = self.active_assistant() {
                    msg.search = Some(SearchInfo {
                        stages: vec![SearchStage::Searching],
                        query,
                        urls: Vec::new(),
                        error: None,
                    });
                    msg.loading = false;
                }
            }
            StreamEvent::SearchResults { urls } => {
                if let Some(info) = self.active_search() {
                    info.stages.push(SearchStage::Reading);
                    info.urls = urls.into_vec();
                }
            }
            StreamEvent::SearchError { error } => {
                if let Some(info) = self.active_search() {
                    info.stages.push(SearchStage::Error);
                    info.error =
                        Some(error.unwrap_or_else(|| SEARCH_ERROR_FALLBACK.to_string()));
                }
            }
            StreamEvent::Error { error } => {
                self.fail_stream(error.as_deref());
            }
            StreamEvent::End => {
                if let Some(msg) = self.active_assistant() {
                    if let Some(info) = msg.search.as_mut() {
                        info.stages.push(SearchStage::Writing);
                        msg.loading = false;
                    }
                }
            }
        }
    }

    /// The transport signalled end-of-stream (or the turn was cancelled):
    /// partial content stands, loading and busy clear, nothing surfaces.
    pub fn finish_stream(&mut self) {
        if let Some(msg) = self.active_assistant() {
            msg.loading = false;
        }
        self.busy = false;
    }

    /// Transport-level failure. The assistant message is finalized with
    /// the failure text only if nothing had streamed yet; already-streamed
    /// partial content is left standing.
    pub fn fail_stream(&mut self, detail: Option<&str>) {
        if let Some(msg) = self.active_assistant() {
            if msg.content.is_empty() {
                msg.content = detail.unwrap_or(CONNECTION_ERROR_TEXT).to_string();
            }
            msg.loading = false;
        }
        self.busy = false;
    }

    /// Drop all messages and the checkpoint token for a fresh start.
    /// The draft is kept.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.checkpoint_id = None;
        self.busy = false;
        self.next_id = 0;
    }
}
