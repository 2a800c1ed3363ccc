//! Transport seam between the session and the wire layer.

use async_trait::async_trait;
use searchly_stream::{ChatClient, ChatEventStream, Result};

/// Opens one streaming chat turn.
///
/// The session depends on this trait rather than on [`ChatClient`]
/// directly, so tests can substitute a scripted transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, message: &str, checkpoint_id: Option<&str>) -> Result<ChatEventStream>;
}

/// Production transport backed by [`ChatClient`].
pub struct HttpTransport {
    client: ChatClient,
}

impl HttpTransport {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, message: &str, checkpoint_id: Option<&str>) -> Result<ChatEventStream> {
        self.client.stream(message, checkpoint_id).await
    }
}
