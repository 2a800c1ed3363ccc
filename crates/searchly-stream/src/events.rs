//! Typed events decoded from `chat_stream` frames

use serde::{Deserialize, Deserializer, Serialize};

/// One decoded frame from the chat stream.
///
/// The tag set is closed; frames with an unknown `type` (or that fail to
/// parse at all) are dropped by [`StreamEvent::parse`] so that server-side
/// additions never abort a running stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Opaque token for resuming the server-side workflow on later turns
    Checkpoint { checkpoint_id: String },
    /// Incremental assistant text
    Content { content: String },
    /// The backend started a web search for `query`
    SearchStart { query: String },
    /// Result URLs for the search in flight
    SearchResults { urls: UrlList },
    /// The search in flight failed
    SearchError {
        #[serde(default)]
        error: Option<String>,
    },
    /// The workflow itself failed; the turn ends as a connection failure
    Error {
        #[serde(default)]
        error: Option<String>,
    },
    /// Terminal frame for the turn
    End,
}

impl StreamEvent {
    /// Decode one `data:` payload. Malformed JSON and unrecognized tags
    /// yield `None`; the frame is dropped and the stream continues.
    pub fn parse(payload: &str) -> Option<Self> {
        match serde_json::from_str(payload) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::trace!("dropping unparseable frame: {e}");
                None
            }
        }
    }

    /// Check if this event ends the turn
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::End | StreamEvent::Error { .. })
    }
}

/// Result URLs as sent by the backend: either a literal JSON array or a
/// JSON string that itself encodes an array.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UrlList(pub Vec<String>);

impl UrlList {
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for UrlList {
    fn from(urls: Vec<String>) -> Self {
        UrlList(urls)
    }
}

impl<'de> Deserialize<'de> for UrlList {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(Vec<String>),
            Encoded(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::List(urls) => Ok(UrlList(urls)),
            Raw::Encoded(s) => {
                let urls = serde_json::from_str(&s).map_err(serde::de::Error::custom)?;
                Ok(UrlList(urls))
            }
        }
    }
}
