//! Web API Mail Tests
//!
//! Integration tests for the token-protected send and inbox endpoints.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use common::{
    create_test_server_with, register_and_login, spawn_fake_smtp, FakeMailbox, RecordingRelay,
    TEST_SECRET,
};
use mailgate::auth::{AuthGate, CredentialStore};
use mailgate::config::{RelayConfig, RelaySecurity};
use mailgate::mail::{MailDispatcher, MailRetriever, SmtpRelay};
use mailgate::web::handlers::AppState;
use mailgate::web::middleware::RateLimitState;
use mailgate::web::router::create_router;
use mailgate::Database;

fn relay_config(port: u16) -> RelayConfig {
    RelayConfig {
        host: "127.0.0.1".to_string(),
        port,
        username: String::new(),
        password: String::new(),
        from: "gateway@example.com".to_string(),
        security: RelaySecurity::None,
        timeout_secs: 5,
    }
}

/// Server whose relay is a real SMTP client pointed at `port`.
async fn create_smtp_server(port: u16) -> axum_test::TestServer {
    let db = Database::open_in_memory().await.unwrap();
    let store = Arc::new(CredentialStore::new(db));
    let gate = Arc::new(AuthGate::new(store.clone(), TEST_SECRET));
    let sessions = Arc::new(Semaphore::new(2));

    let dispatcher = Arc::new(MailDispatcher::new(
        Arc::new(SmtpRelay::new(relay_config(port))),
        sessions.clone(),
    ));
    let retriever = Arc::new(MailRetriever::new(
        Arc::new(FakeMailbox::default()),
        sessions,
        Duration::from_secs(5),
    ));

    let state = Arc::new(AppState::new(store, gate, dispatcher, retriever));
    axum_test::TestServer::new(create_router(state, Arc::new(RateLimitState::new(1000)))).unwrap()
}

// ============================================================================
// Authentication on mail endpoints
// ============================================================================

#[tokio::test]
async fn test_emails_without_header_is_rejected_before_io() {
    let mailbox = Arc::new(FakeMailbox::with_headers(&["Subject: hi\r\n\r\n"]));
    let server =
        create_test_server_with(Arc::new(RecordingRelay::default()), mailbox.clone(), 1000).await;

    let response = server.get("/emails").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(mailbox.calls(), 0);
}

#[tokio::test]
async fn test_send_without_header_is_rejected_before_io() {
    let relay = Arc::new(RecordingRelay::default());
    let server = create_test_server_with(relay.clone(), Arc::new(FakeMailbox::default()), 1000).await;

    let response = server
        .post("/send")
        .json(&json!({"to": "b@y.com", "subject": "Hi", "text": "Hello"}))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert!(relay.sent().is_empty());
}

#[tokio::test]
async fn test_invalid_token_is_bad_request() {
    let mailbox = Arc::new(FakeMailbox::default());
    let server =
        create_test_server_with(Arc::new(RecordingRelay::default()), mailbox.clone(), 1000).await;

    let response = server
        .get("/emails")
        .add_header(AUTHORIZATION, "Bearer not.a.token")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .get("/emails")
        .add_header(AUTHORIZATION, "Token abc")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(mailbox.calls(), 0);
}

// ============================================================================
// POST /send
// ============================================================================

#[tokio::test]
async fn test_send_success() {
    let relay = Arc::new(RecordingRelay::default());
    let server = create_test_server_with(relay.clone(), Arc::new(FakeMailbox::default()), 1000).await;
    let token = register_and_login(&server, "a@x.com", "secret").await;

    let response = server
        .post("/send")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({"to": "b@y.com", "subject": "Hi", "text": "Hello"}))
        .await;

    response.assert_status_ok();
    response.assert_text("Email sent successfully");

    let sent = relay.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "b@y.com");
    assert_eq!(sent[0].subject, "Hi");
    assert_eq!(sent[0].body, "Hello");
}

#[tokio::test]
async fn test_send_relay_failure() {
    let server = create_test_server_with(
        Arc::new(RecordingRelay::failing()),
        Arc::new(FakeMailbox::default()),
        1000,
    )
    .await;
    let token = register_and_login(&server, "a@x.com", "secret").await;

    let response = server
        .post("/send")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({"to": "b@y.com", "subject": "Hi", "text": "Hello"}))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"]["message"], "Error sending email");
}

#[tokio::test]
async fn test_send_invalid_recipient() {
    let relay = Arc::new(RecordingRelay::default());
    let server = create_test_server_with(relay.clone(), Arc::new(FakeMailbox::default()), 1000).await;
    let token = register_and_login(&server, "a@x.com", "secret").await;

    let response = server
        .post("/send")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({"to": "nobody", "subject": "Hi", "text": "Hello"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(relay.sent().is_empty());
}

#[tokio::test]
async fn test_send_subject_with_line_break() {
    let relay = Arc::new(RecordingRelay::default());
    let server = create_test_server_with(relay.clone(), Arc::new(FakeMailbox::default()), 1000).await;
    let token = register_and_login(&server, "a@x.com", "secret").await;

    let response = server
        .post("/send")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({"to": "b@y.com", "subject": "Hi\r\nBcc: c@z.com", "text": "x"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(relay.sent().is_empty());
}

#[tokio::test]
async fn test_send_through_unreachable_smtp_relay() {
    // Reserve a port, then free it so nothing is listening there.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let server = create_smtp_server(port).await;
    let token = register_and_login(&server, "a@x.com", "secret").await;

    let response = server
        .post("/send")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({"to": "b@y.com", "subject": "Hi", "text": "Hello"}))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"]["message"], "Error sending email");
}

#[tokio::test]
async fn test_send_through_reachable_smtp_relay() {
    let (addr, received) = spawn_fake_smtp().await;
    let server = create_smtp_server(addr.port()).await;
    let token = register_and_login(&server, "a@x.com", "secret").await;

    let response = server
        .post("/send")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({"to": "b@y.com", "subject": "Hi", "text": "Hello"}))
        .await;

    response.assert_status_ok();
    response.assert_text("Email sent successfully");

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].contains("Subject: Hi"));
    assert!(received[0].contains("From: gateway@example.com"));
    assert!(received[0].contains("Hello"));
}

// ============================================================================
// GET /emails
// ============================================================================

#[tokio::test]
async fn test_emails_summaries() {
    let mailbox = Arc::new(FakeMailbox::with_headers(&[
        "From: Alice <alice@example.com>\r\nSubject: Report\r\nDate: Mon, 2 Mar 2026 10:15:00 +0000\r\n\r\n",
        "X-Mailer: test\r\n\r\n",
    ]));
    let server =
        create_test_server_with(Arc::new(RecordingRelay::default()), mailbox.clone(), 1000).await;
    let token = register_and_login(&server, "a@x.com", "secret").await;

    let response = server
        .get("/emails")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let emails = body.as_array().unwrap();
    assert_eq!(emails.len(), 2);

    assert_eq!(emails[0]["subject"], "Report");
    assert_eq!(emails[0]["from"], "Alice <alice@example.com>");
    assert_ne!(emails[0]["date"], "Unknown Date");

    assert_eq!(emails[1]["subject"], "No Subject");
    assert_eq!(emails[1]["from"], "Unknown Sender");
    assert_eq!(emails[1]["date"], "Unknown Date");

    assert_eq!(mailbox.calls(), 1);
}

#[tokio::test]
async fn test_emails_empty_mailbox() {
    let server = create_test_server_with(
        Arc::new(RecordingRelay::default()),
        Arc::new(FakeMailbox::default()),
        1000,
    )
    .await;
    let token = register_and_login(&server, "a@x.com", "secret").await;

    let response = server
        .get("/emails")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!([]));
}

#[tokio::test]
async fn test_emails_mailbox_unreachable() {
    let server = create_test_server_with(
        Arc::new(RecordingRelay::default()),
        Arc::new(FakeMailbox::unreachable()),
        1000,
    )
    .await;
    let token = register_and_login(&server, "a@x.com", "secret").await;

    let response = server
        .get("/emails")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"]["message"], "Error retrieving emails");
}
