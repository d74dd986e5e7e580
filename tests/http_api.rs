//! HTTP boundary tests: JSON shapes, status codes, and the poll transport
//! end to end over a real listener.

use paird::config::LimitsConfig;
use paird::state::Hub;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Bind the app on an ephemeral port and serve it in the background.
async fn spawn_app() -> (SocketAddr, Arc<Hub>) {
    let hub = Arc::new(Hub::new(&LimitsConfig::default()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    let app = paird::http::router(Arc::clone(&hub));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (addr, hub)
}

/// Minimal HTTP/1.1 client: one request per connection, read to EOF.
async fn request(
    addr: SocketAddr,
    method: &str,
    path: &str,
    body: Option<&Value>,
) -> (u16, Value) {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let payload = body.map(Value::to_string).unwrap_or_default();
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    stream.write_all(request.as_bytes()).await.expect("write");

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.expect("read");
    let text = String::from_utf8(raw).expect("utf8 response");
    let (head, body) = text.split_once("\r\n\r\n").expect("header terminator");
    let status: u16 = head
        .split_whitespace()
        .nth(1)
        .expect("status code")
        .parse()
        .expect("numeric status");
    let json = serde_json::from_str(body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_join_returns_identity_and_queue_position() {
    let (addr, _hub) = spawn_app().await;

    let (status, body) = request(
        addr,
        "POST",
        "/api/chat/join",
        Some(&json!({"sessionId": "s1"})),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert!(body["displayName"].as_str().is_some_and(|n| !n.is_empty()));
    assert_eq!(body["queuePosition"], 1);
    assert_eq!(body["totalActive"], 1);
}

#[tokio::test]
async fn test_two_joins_match_and_deliver_events() {
    let (addr, _hub) = spawn_app().await;

    request(addr, "POST", "/api/chat/join", Some(&json!({"sessionId": "s1"}))).await;
    let (_, join2) =
        request(addr, "POST", "/api/chat/join", Some(&json!({"sessionId": "s2"}))).await;
    assert!(join2.get("queuePosition").is_none());

    let (status, body) = request(addr, "GET", "/api/chat/events?sessionId=s1", None).await;
    assert_eq!(status, 200);
    assert!(body["serverTime"].is_string());

    let events = body["events"].as_array().expect("events array");
    let types: Vec<&str> = events
        .iter()
        .filter_map(|e| e["type"].as_str())
        .collect();
    assert_eq!(types.first(), Some(&"connected"));
    assert!(types.contains(&"matched"));
    assert!(types.contains(&"user_count"));

    let matched = events
        .iter()
        .find(|e| e["type"] == "matched")
        .expect("matched event");
    assert_eq!(matched["partnerId"], "s2");
    assert_eq!(matched["partnerName"], join2["displayName"]);
}

#[tokio::test]
async fn test_message_relay_and_cursor_poll() {
    let (addr, _hub) = spawn_app().await;
    request(addr, "POST", "/api/chat/join", Some(&json!({"sessionId": "s1"}))).await;
    request(addr, "POST", "/api/chat/join", Some(&json!({"sessionId": "s2"}))).await;

    // Drain s2 and remember the cursor
    let (_, first) = request(addr, "GET", "/api/chat/events?sessionId=s2", None).await;
    let cursor = first["events"]
        .as_array()
        .unwrap()
        .last()
        .unwrap()["id"]
        .as_u64()
        .unwrap();

    let (status, _) = request(
        addr,
        "POST",
        "/api/chat/message",
        Some(&json!({"sessionId": "s1", "partnerId": "s2", "message": "hi"})),
    )
    .await;
    assert_eq!(status, 200);

    let path = format!("/api/chat/events?sessionId=s2&cursor={cursor}");
    let (_, poll) = request(addr, "GET", &path, None).await;
    let events = poll["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], "message");
    assert_eq!(events[0]["text"], "hi");
    assert!(events[0]["id"].as_u64().unwrap() > cursor);
}

#[tokio::test]
async fn test_error_status_mapping() {
    let (addr, _hub) = spawn_app().await;

    // Blank id: validation
    let (status, body) = request(
        addr,
        "POST",
        "/api/chat/join",
        Some(&json!({"sessionId": "  "})),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "validation");

    // Unknown session: not found
    let (status, body) = request(addr, "GET", "/api/chat/events?sessionId=ghost", None).await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "not_found");

    // Unpaired message: mismatch
    request(addr, "POST", "/api/chat/join", Some(&json!({"sessionId": "s1"}))).await;
    request(addr, "POST", "/api/chat/join", Some(&json!({"sessionId": "s2"}))).await;
    request(addr, "POST", "/api/chat/join", Some(&json!({"sessionId": "s3"}))).await;
    let (status, body) = request(
        addr,
        "POST",
        "/api/chat/message",
        Some(&json!({"sessionId": "s3", "partnerId": "s1", "message": "hi"})),
    )
    .await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "pairing_mismatch");
}

#[tokio::test]
async fn test_leave_and_next_round_trip() {
    let (addr, hub) = spawn_app().await;
    request(addr, "POST", "/api/chat/join", Some(&json!({"sessionId": "s1"}))).await;
    request(addr, "POST", "/api/chat/join", Some(&json!({"sessionId": "s2"}))).await;

    let (status, body) = request(
        addr,
        "POST",
        "/api/chat/next",
        Some(&json!({"sessionId": "s1"})),
    )
    .await;
    assert_eq!(status, 200);
    // Rematched immediately with the re-queued s2
    assert!(body.get("queuePosition").is_none());

    let (status, body) = request(
        addr,
        "POST",
        "/api/chat/leave",
        Some(&json!({"sessionId": "s1"})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert!(hub.session("s1").is_none());
}
