//! Test helpers for HTTP integration tests.
//!
//! Provides a `TestServer` wired to an in-memory database, fake relay and
//! mailbox implementations, and a minimal SMTP responder.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use mailgate::auth::{AuthGate, CredentialStore};
use mailgate::mail::{
    DispatchError, FetchedHeader, MailDispatcher, MailRelay, MailRetriever, MailboxSource,
    OutboundMessage, RetrievalError,
};
use mailgate::web::handlers::AppState;
use mailgate::web::middleware::RateLimitState;
use mailgate::web::router::create_router;
use mailgate::Database;

/// JWT secret used by every test server.
pub const TEST_SECRET: &str = "test-secret-key-for-testing-only";

/// Relay that records messages instead of sending them.
#[derive(Default)]
pub struct RecordingRelay {
    sent: Mutex<Vec<OutboundMessage>>,
    fail: bool,
}

impl RecordingRelay {
    /// A relay whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Messages delivered so far.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailRelay for RecordingRelay {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), DispatchError> {
        if self.fail {
            return Err(DispatchError::Transport("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Mailbox serving a fixed set of headers.
#[derive(Default)]
pub struct FakeMailbox {
    headers: Vec<FetchedHeader>,
    calls: AtomicUsize,
    fail: bool,
}

impl FakeMailbox {
    /// A mailbox holding `raw_headers`, all without an internal date.
    pub fn with_headers(raw_headers: &[&str]) -> Self {
        Self {
            headers: raw_headers
                .iter()
                .map(|raw| FetchedHeader {
                    internal_date: None,
                    raw: raw.as_bytes().to_vec(),
                })
                .collect(),
            ..Default::default()
        }
    }

    /// A mailbox that cannot be reached.
    pub fn unreachable() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Number of fetches attempted.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailboxSource for FakeMailbox {
    async fn fetch_headers_since(
        &self,
        _since: NaiveDate,
    ) -> Result<Vec<FetchedHeader>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RetrievalError::Connection("connection refused".to_string()));
        }
        Ok(self.headers.clone())
    }
}

/// Build a test server over the given relay and mailbox.
pub async fn create_test_server_with(
    relay: Arc<dyn MailRelay>,
    mailbox: Arc<dyn MailboxSource>,
    login_rate_limit: u32,
) -> TestServer {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");

    let store = Arc::new(CredentialStore::new(db));
    let gate = Arc::new(AuthGate::new(store.clone(), TEST_SECRET));
    let sessions = Arc::new(Semaphore::new(4));
    let dispatcher = Arc::new(MailDispatcher::new(relay, sessions.clone()));
    let retriever = Arc::new(MailRetriever::new(
        mailbox,
        sessions,
        Duration::from_secs(5),
    ));

    let app_state = Arc::new(AppState::new(store, gate, dispatcher, retriever));
    let router = create_router(app_state, Arc::new(RateLimitState::new(login_rate_limit)));

    TestServer::new(router).expect("Failed to create test server")
}

/// Build a test server with a recording relay and an empty mailbox.
pub async fn create_test_server() -> TestServer {
    create_test_server_with(
        Arc::new(RecordingRelay::default()),
        Arc::new(FakeMailbox::default()),
        1000,
    )
    .await
}

/// Register an identity.
pub async fn register(server: &TestServer, identity_key: &str, password: &str) {
    server
        .post("/register")
        .json(&json!({
            "identity_key": identity_key,
            "password": password
        }))
        .await
        .assert_status_ok();
}

/// Log in and return the session token.
pub async fn login(server: &TestServer, identity_key: &str, password: &str) -> String {
    let response = server
        .post("/login")
        .json(&json!({
            "identity_key": identity_key,
            "password": password
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    body["token"]
        .as_str()
        .expect("login response has no token")
        .to_string()
}

/// Register an identity and return a session token for it.
pub async fn register_and_login(server: &TestServer, identity_key: &str, password: &str) -> String {
    register(server, identity_key, password).await;
    login(server, identity_key, password).await
}

/// Start a minimal SMTP responder on a random local port.
///
/// Accepts every message and records its DATA section.
pub async fn spawn_fake_smtp() -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));

    let sink = received.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let sink = sink.clone();
            tokio::spawn(async move {
                let _ = serve_smtp(stream, sink).await;
            });
        }
    });

    (addr, received)
}

async fn serve_smtp(stream: TcpStream, sink: Arc<Mutex<Vec<String>>>) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    write.write_all(b"220 localhost ESMTP test\r\n").await?;

    let mut in_data = false;
    let mut message = String::new();

    while let Some(line) = lines.next_line().await? {
        if in_data {
            if line == "." {
                in_data = false;
                sink.lock().unwrap().push(std::mem::take(&mut message));
                write.write_all(b"250 2.0.0 OK queued\r\n").await?;
            } else {
                message.push_str(&line);
                message.push('\n');
            }
            continue;
        }

        let verb = line
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        match verb.as_str() {
            "EHLO" | "HELO" => write.write_all(b"250 localhost\r\n").await?,
            "MAIL" | "RCPT" | "RSET" | "NOOP" => write.write_all(b"250 2.1.0 OK\r\n").await?,
            "DATA" => {
                in_data = true;
                write
                    .write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n")
                    .await?;
            }
            "QUIT" => {
                write.write_all(b"221 2.0.0 Bye\r\n").await?;
                return Ok(());
            }
            _ => write.write_all(b"502 5.5.2 Command not recognized\r\n").await?,
        }
    }

    Ok(())
}
