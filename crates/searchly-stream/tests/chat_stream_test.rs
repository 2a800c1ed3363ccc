//! HTTP-level tests for the chat stream client against a mock backend.

use futures::StreamExt;
use searchly_stream::{ChatClient, Error, StreamEvent};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TURN_BODY: &str = concat!(
    "data: {\"type\": \"checkpoint\", \"checkpoint_id\": \"c1\"}\n\n",
    "data: {\"type\": \"search_start\", \"query\": \"rust sse\"}\n\n",
    "data: {\"type\": \"search_results\", \"urls\": [\"https://a\", \"https://b\"]}\n\n",
    "data: {\"type\": \"content\", \"content\": \"Hel\"}\n\n",
    "data: {\"type\": \"content\", \"content\": \"lo\"}\n\n",
    "data: {\"type\": \"end\"}\n\n",
);

async fn mock_backend(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat_stream"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/event-stream"),
        )
        .mount(&server)
        .await;
    server
}

async fn collect(client: &ChatClient, message: &str) -> Vec<StreamEvent> {
    let mut stream = client.stream(message, None).await.expect("stream opens");
    let mut events = Vec::new();
    while let Some(item) = stream.next().await {
        events.push(item.expect("no transport error"));
    }
    events
}

#[tokio::test]
async fn test_full_turn_decodes_in_order() {
    let server = mock_backend(TURN_BODY).await;
    let client = ChatClient::new(server.uri());

    let events = collect(&client, "hello").await;
    assert_eq!(events.len(), 6);
    assert!(matches!(events[0], StreamEvent::Checkpoint { ref checkpoint_id } if checkpoint_id == "c1"));
    assert!(matches!(events[1], StreamEvent::SearchStart { ref query } if query == "rust sse"));
    assert!(matches!(events[3], StreamEvent::Content { ref content } if content == "Hel"));
    assert_eq!(events[5], StreamEvent::End);
}

#[tokio::test]
async fn test_malformed_and_unknown_frames_skipped() {
    let body = concat!(
        "data: {\"type\": \"content\", \"content\": \"A\"}\n\n",
        "data: {not json}\n\n",
        "data: {\"type\": \"brand_new_tag\"}\n\n",
        ": keep-alive\n\n",
        "data: {\"type\": \"end\"}\n\n",
    );
    let server = mock_backend(body).await;
    let client = ChatClient::new(server.uri());

    let events = collect(&client, "hello").await;
    assert_eq!(
        events,
        vec![
            StreamEvent::Content {
                content: "A".to_string()
            },
            StreamEvent::End,
        ]
    );
}

#[tokio::test]
async fn test_non_success_status_is_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat_stream"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = ChatClient::new(server.uri());
    let err = client.stream("hello", None).await.err().expect("must fail");
    match err {
        Error::Connection { status } => assert_eq!(status.as_u16(), 503),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_checkpoint_id_sent_in_request_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat_stream"))
        .and(body_partial_json(serde_json::json!({
            "message": "again",
            "checkpoint_id": "c1",
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("data: {\"type\": \"end\"}\n\n", "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(server.uri());
    let mut stream = client.stream("again", Some("c1")).await.expect("opens");
    let first = stream.next().await.expect("one event").expect("decodes");
    assert_eq!(first, StreamEvent::End);
}
