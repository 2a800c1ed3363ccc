//! HTTP client for the `chat_stream` endpoint

use crate::error::{Error, Result};
use crate::events::StreamEvent;
use crate::framer::SseFramer;
use async_stream::stream;
use futures::StreamExt;
use serde::Serialize;
use std::pin::Pin;
use tokio_stream::Stream;

/// A stream of decoded chat events. Ends when the body is exhausted, or
/// after yielding a single terminal `Err` on a transport failure.
pub type ChatEventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    checkpoint_id: Option<&'a str>,
}

/// Client for one Searchly backend.
///
/// Constructed explicitly and handed to whoever owns the conversation;
/// there is no process-wide instance. Dropping the returned stream aborts
/// the underlying request.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    /// Create a client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing a caller-supplied `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Open a streaming chat turn.
    ///
    /// Issues `POST {base_url}/chat_stream` with the message and the
    /// optional checkpoint token. A non-success status before streaming
    /// begins fails the whole turn with [`Error::Connection`].
    pub async fn stream(
        &self,
        message: &str,
        checkpoint_id: Option<&str>,
    ) -> Result<ChatEventStream> {
        let url = format!("{}/chat_stream", self.base_url);
        tracing::debug!(%url, continuing = checkpoint_id.is_some(), "opening chat stream");

        let response = self
            .http
            .post(&url)
            .json(&ChatRequest {
                message,
                checkpoint_id,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Connection { status });
        }

        let mut body = response.bytes_stream();
        Ok(Box::pin(stream! {
            let mut framer = SseFramer::new();
            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(bytes) => {
                        for payload in framer.push_bytes(&bytes) {
                            if let Some(event) = StreamEvent::parse(&payload) {
                                yield Ok(event);
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!("chat stream read failed: {e}");
                        yield Err(Error::Http(e));
                        return;
                    }
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = ChatClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_request_body_omits_absent_checkpoint() {
        let body = serde_json::to_string(&ChatRequest {
            message: "hi",
            checkpoint_id: None,
        })
        .unwrap();
        assert_eq!(body, r#"{"message":"hi"}"#);
    }

    #[test]
    fn test_request_body_carries_checkpoint() {
        let body = serde_json::to_string(&ChatRequest {
            message: "hi",
            checkpoint_id: Some("c1"),
        })
        .unwrap();
        assert_eq!(body, r#"{"message":"hi","checkpoint_id":"c1"}"#);
    }
}
