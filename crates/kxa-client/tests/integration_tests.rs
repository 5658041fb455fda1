//! Integration tests for kxa-client
//!
//! These tests spin up a real HTTP server and drive the client against it,
//! so chunking, status handling and connection teardown go through the
//! actual transport.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use tokio::sync::Notify;

use kxa_client::testing::TestServer;
use kxa_client::{
    CancellationToken, ChatMessage, ChatRequest, ClientConfig, DecodedEvent, FramingMode,
    StreamError, StreamOutcome,
};

// =============================================================================
// Helpers
// =============================================================================

type Chunk = Result<Bytes, std::io::Error>;

/// Build an event-stream response from a chunk stream
fn event_stream<S>(chunks: S) -> Response
where
    S: futures::Stream<Item = Chunk> + Send + 'static,
{
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(chunks),
    )
        .into_response()
}

/// Serve fixed chunks with a pause between them so they arrive separately
fn paced(chunks: Vec<&'static str>) -> Response {
    event_stream(async_stream::stream! {
        for chunk in chunks {
            yield Ok::<_, std::io::Error>(Bytes::from_static(chunk.as_bytes()));
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
}

fn question() -> Vec<ChatMessage> {
    vec![ChatMessage::user("What changed in the Q3 release notes?")]
}

async fn drain(mut stream: kxa_client::ChatStream) -> Vec<DecodedEvent> {
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event.expect("stream should not fail"));
    }
    events
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn test_split_frames_reassembled() {
    let router = Router::new().route(
        "/stream",
        post(|| async {
            paced(vec![
                "da",
                "ta: {\"delta\":\"Hel\"}\n",
                "\ndata: {\"del",
                "ta\":\"lo\",\"context\":{\"sources\":[\"notes.md\"]}}\n\n: ping\n\n",
                "data: \"!\"\n\n",
            ])
        }),
    );
    let server = TestServer::start(router).await.unwrap();

    let stream = server
        .client
        .chat_stream(question(), CancellationToken::new())
        .await
        .unwrap();
    let events = drain(stream).await;

    assert_eq!(events.len(), 3);
    assert_eq!(events[0], DecodedEvent::delta("Hel"));
    assert_eq!(events[1].delta.as_deref(), Some("lo"));
    assert_eq!(
        events[1].context,
        Some(serde_json::json!({"sources": ["notes.md"]}))
    );
    assert_eq!(events[2], DecodedEvent::delta("!"));
}

#[tokio::test]
async fn test_request_body_sent() {
    // Echo the last message back as a single delta
    let router = Router::new().route(
        "/api/stream",
        post(|Json(request): Json<ChatRequest>| async move {
            let last = request
                .messages
                .last()
                .map(|m| format!("{}:{}", m.role, m.content))
                .unwrap_or_default();
            let frame = format!("data: {}\n\ndata: [DONE]\n\n", serde_json::json!(last));
            event_stream(futures::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(frame))]))
        }),
    );
    let server = TestServer::start(router).await.unwrap();
    let client = kxa_client::KxaClient::new(&format!("{}/api", server.base_url())).unwrap();

    let messages = vec![
        ChatMessage::system("Cite sources"),
        ChatMessage::user("Where is the SLA defined?"),
    ];
    let response = client
        .chat_stream(messages, CancellationToken::new())
        .await
        .unwrap()
        .collect_response()
        .await
        .unwrap();

    assert_eq!(response.text, "user:Where is the SLA defined?");
    assert_eq!(response.outcome, Some(StreamOutcome::Done));
}

#[tokio::test]
async fn test_line_mode() {
    let router = Router::new().route(
        "/stream",
        post(|| async {
            paced(vec![
                "data: {\"delta\":\"a\"}\ndata: {\"de",
                "lta\":\"b\"}\nevent: x\n",
                "data: {\"card\":{\"title\":\"Doc\"}}\n",
            ])
        }),
    );
    let config = ClientConfig {
        framing: FramingMode::Line,
        ..ClientConfig::default()
    };
    let server = TestServer::start_with_config(router, config).await.unwrap();

    let response = server
        .client
        .chat_stream(question(), CancellationToken::new())
        .await
        .unwrap()
        .collect_response()
        .await
        .unwrap();

    assert_eq!(response.text, "ab");
    assert_eq!(response.attachments, vec![serde_json::json!({"title": "Doc"})]);
    assert_eq!(response.outcome, Some(StreamOutcome::Completed));
}

#[tokio::test]
async fn test_events_arrive_before_transfer_ends() {
    let release = Arc::new(Notify::new());
    let gate = release.clone();

    let router = Router::new().route(
        "/stream",
        post(move || {
            let gate = gate.clone();
            async move {
                event_stream(async_stream::stream! {
                    yield Ok::<_, std::io::Error>(Bytes::from_static(b"data: \"first\"\n\n"));
                    gate.notified().await;
                    yield Ok::<_, std::io::Error>(Bytes::from_static(b"data: \"second\"\n\n"));
                })
            }
        }),
    );
    let server = TestServer::start(router).await.unwrap();

    let mut stream = server
        .client
        .chat_stream(question(), CancellationToken::new())
        .await
        .unwrap();

    // The server is still holding the rest of the body
    let first = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("first event should arrive while the body is open");
    assert_eq!(first.unwrap().unwrap(), DecodedEvent::delta("first"));

    release.notify_one();

    assert_eq!(
        stream.next().await.unwrap().unwrap(),
        DecodedEvent::delta("second")
    );
    assert!(stream.next().await.is_none());
    assert_eq!(stream.outcome(), Some(StreamOutcome::Completed));
}

#[tokio::test]
async fn test_sentinel_ends_open_stream() {
    let router = Router::new().route(
        "/stream",
        post(|| async {
            event_stream(async_stream::stream! {
                yield Ok::<_, std::io::Error>(Bytes::from_static(
                    b"data: \"only\"\n\ndata: [DONE]\n\ndata: \"never\"\n\n",
                ));
                // Never ends on its own
                futures::future::pending::<()>().await;
            })
        }),
    );
    let server = TestServer::start(router).await.unwrap();

    let stream = server
        .client
        .chat_stream(question(), CancellationToken::new())
        .await
        .unwrap();

    let events = tokio::time::timeout(Duration::from_secs(5), drain(stream))
        .await
        .expect("sentinel should end the stream");
    assert_eq!(events, vec![DecodedEvent::delta("only")]);
}

#[tokio::test]
async fn test_malformed_frame_invisible_to_consumer() {
    let router = Router::new().route(
        "/stream",
        post(|| async {
            paced(vec![
                "data: {\"delta\":\"one\"}\n\n",
                "data: {not json}\n\n",
                "data: {\"delta\":\"two\"}\n\ndata: [DONE]\n\n",
            ])
        }),
    );
    let server = TestServer::start(router).await.unwrap();

    let stream = server
        .client
        .chat_stream(question(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        drain(stream).await,
        vec![DecodedEvent::delta("one"), DecodedEvent::delta("two")]
    );
}

// =============================================================================
// Setup failures
// =============================================================================

#[tokio::test]
async fn test_rate_limited_setup_failure() {
    let router = Router::new().route(
        "/stream",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "\"rate limited\"") }),
    );
    let server = TestServer::start(router).await.unwrap();

    let err = server
        .client
        .chat_stream(question(), CancellationToken::new())
        .await
        .err()
        .expect("429 must fail before any event");

    assert!(matches!(err, StreamError::Setup { status: 429, .. }));
    let message = err.to_string();
    assert!(message.contains("429"), "{}", message);
    assert!(message.contains("rate limited"), "{}", message);
}

#[tokio::test]
async fn test_error_without_body() {
    let router = Router::new().route(
        "/stream",
        post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let server = TestServer::start(router).await.unwrap();

    let err = server
        .client
        .chat_stream(question(), CancellationToken::new())
        .await
        .err()
        .unwrap();

    assert_eq!(err.status(), Some(503));
    assert!(err.to_string().contains("503 Service Unavailable"));
}

/// Failing 500 whose body is flushed in part and then never completes cleanly
fn broken_error_body(stall: bool) -> Response {
    let body = async_stream::stream! {
        yield Ok::<_, std::io::Error>(Bytes::from_static(b"partial trace"));
        tokio::time::sleep(Duration::from_millis(5)).await;
        if stall {
            futures::future::pending::<()>().await;
        }
        yield Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "backend died"));
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Body::from_stream(body)).into_response()
}

#[tokio::test]
async fn test_error_body_read_failure_keeps_status() {
    let router = Router::new().route("/stream", post(|| async { broken_error_body(false) }));
    let server = TestServer::start(router).await.unwrap();

    let err = server
        .client
        .chat_stream(question(), CancellationToken::new())
        .await
        .err()
        .expect("500 must fail before any event");

    assert!(matches!(err, StreamError::Setup { status: 500, .. }));
    assert!(
        err.to_string().ends_with("(500): 500 Internal Server Error"),
        "{}",
        err
    );
}

#[tokio::test]
async fn test_stalled_error_body_keeps_status() {
    let router = Router::new().route("/stream", post(|| async { broken_error_body(true) }));
    let server = TestServer::start(router).await.unwrap();

    let err = tokio::time::timeout(
        Duration::from_secs(10),
        server.client.chat_stream(question(), CancellationToken::new()),
    )
    .await
    .expect("error body read must be time-bounded")
    .err()
    .expect("500 must fail before any event");

    assert!(matches!(err, StreamError::Setup { status: 500, .. }));
    assert!(
        err.to_string().ends_with("(500): 500 Internal Server Error"),
        "{}",
        err
    );
}

#[tokio::test]
async fn test_empty_body_is_setup_failure() {
    let router = Router::new()
        .route("/stream", post(|| async { StatusCode::NO_CONTENT }))
        .route("/empty/stream", post(|| async { "" }));
    let server = TestServer::start(router).await.unwrap();

    let err = server
        .client
        .chat_stream(question(), CancellationToken::new())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, StreamError::Setup { status: 204, .. }));

    let client = kxa_client::KxaClient::new(&format!("{}/empty", server.base_url())).unwrap();
    let err = client
        .chat_stream(question(), CancellationToken::new())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, StreamError::Setup { status: 200, .. }));
    assert!(err.to_string().contains("no body"));
}

#[tokio::test]
async fn test_connection_refused() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = kxa_client::KxaClient::new(&format!("http://{}", addr)).unwrap();
    let err = client
        .chat_stream(question(), CancellationToken::new())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, StreamError::Connection(_)));
}

// =============================================================================
// Cancellation and transport failure
// =============================================================================

#[tokio::test]
async fn test_cancel_mid_stream() {
    let router = Router::new().route(
        "/stream",
        post(|| async {
            event_stream(async_stream::stream! {
                yield Ok::<_, std::io::Error>(Bytes::from_static(b"data: \"partial\"\n\n"));
                futures::future::pending::<()>().await;
            })
        }),
    );
    let server = TestServer::start(router).await.unwrap();
    let cancel = CancellationToken::new();

    let mut stream = server
        .client
        .chat_stream(question(), cancel.clone())
        .await
        .unwrap();
    assert_eq!(
        stream.next().await.unwrap().unwrap(),
        DecodedEvent::delta("partial")
    );

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let next = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("cancel should interrupt the pending read");
    assert!(next.unwrap().unwrap_err().is_cancelled());
    assert!(stream.next().await.is_none());
    assert_eq!(stream.outcome(), Some(StreamOutcome::Cancelled));
}

#[tokio::test]
async fn test_cancel_before_response() {
    let router = Router::new().route(
        "/stream",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            "data: [DONE]\n\n"
        }),
    );
    let server = TestServer::start(router).await.unwrap();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        server.client.chat_stream(question(), cancel),
    )
    .await
    .expect("cancel should abort setup");

    assert!(matches!(result, Err(StreamError::Cancelled)));
}

#[tokio::test]
async fn test_transport_drop_is_fatal() {
    let router = Router::new().route(
        "/stream",
        post(|| async {
            event_stream(async_stream::stream! {
                yield Ok::<_, std::io::Error>(Bytes::from_static(b"data: \"before\"\n\n"));
                tokio::time::sleep(Duration::from_millis(5)).await;
                yield Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "backend died"));
            })
        }),
    );
    let server = TestServer::start(router).await.unwrap();

    let mut stream = server
        .client
        .chat_stream(question(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        stream.next().await.unwrap().unwrap(),
        DecodedEvent::delta("before")
    );

    let err = stream.next().await.unwrap().unwrap_err();
    assert!(matches!(err, StreamError::Read(_)));
    assert!(stream.next().await.is_none());
    assert_eq!(stream.outcome(), Some(StreamOutcome::Failed));
}
