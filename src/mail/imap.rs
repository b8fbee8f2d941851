//! IMAP mailbox backed by async-imap over rustls.

use std::collections::HashSet;
use std::sync::Arc;

use async_imap::types::Fetch;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures::TryStreamExt;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use super::retrieve::{MailboxSource, RetrievalError};
use super::types::FetchedHeader;
use crate::config::MailboxConfig;

const INBOX: &str = "INBOX";
const FETCH_ITEMS: &str = "(INTERNALDATE BODY.PEEK[HEADER])";

type ImapSession = async_imap::Session<TlsStream<TcpStream>>;

/// Mailbox reached over implicit-TLS IMAP, one session per call.
pub struct ImapMailbox {
    config: MailboxConfig,
    connector: TlsConnector,
}

impl ImapMailbox {
    /// Create a mailbox for the configured operational account.
    pub fn new(config: MailboxConfig) -> Result<Self, RetrievalError> {
        Ok(Self {
            config,
            connector: create_tls_connector()?,
        })
    }

    async fn open_session(&self) -> Result<ImapSession, RetrievalError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        debug!("Opening IMAP session to {}", addr);

        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|e| RetrievalError::Connection(format!("{addr}: {e}")))?;
        let server_name = ServerName::try_from(self.config.host.clone())
            .map_err(|e| RetrievalError::Connection(e.to_string()))?;
        let tls = self
            .connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| RetrievalError::Connection(format!("TLS handshake failed: {e}")))?;

        let mut client = async_imap::Client::new(tls);
        read_greeting(&mut client).await?;

        client
            .login(&self.config.username, &self.config.password)
            .await
            .map_err(|(e, _)| RetrievalError::Protocol(format!("login rejected: {e}")))
    }
}

#[async_trait]
impl MailboxSource for ImapMailbox {
    async fn fetch_headers_since(
        &self,
        since: NaiveDate,
    ) -> Result<Vec<FetchedHeader>, RetrievalError> {
        let mut session = self.open_session().await?;

        let result = fetch_inbox_headers(&mut session, since).await;

        if let Err(e) = session.logout().await {
            debug!("IMAP logout failed: {}", e);
        }
        result
    }
}

impl std::fmt::Debug for ImapMailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapMailbox")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .finish()
    }
}

async fn fetch_inbox_headers(
    session: &mut ImapSession,
    since: NaiveDate,
) -> Result<Vec<FetchedHeader>, RetrievalError> {
    session.select(INBOX).await.map_err(protocol_error)?;

    let query = search_query(since);
    let ids = session.search(&query).await.map_err(protocol_error)?;
    debug!("IMAP search {:?} matched {} messages", query, ids.len());

    let Some(set) = sequence_set(&ids) else {
        return Ok(Vec::new());
    };

    let fetches: Vec<Fetch> = session
        .fetch(&set, FETCH_ITEMS)
        .await
        .map_err(protocol_error)?
        .try_collect()
        .await
        .map_err(protocol_error)?;

    Ok(fetches
        .iter()
        .map(|fetch| FetchedHeader {
            internal_date: fetch.internal_date().map(|d| d.with_timezone(&Utc)),
            raw: fetch.header().map(<[u8]>::to_vec).unwrap_or_default(),
        })
        .collect())
}

/// Wait for the server greeting before sending any command.
async fn read_greeting<T>(client: &mut async_imap::Client<T>) -> Result<(), RetrievalError>
where
    T: AsyncRead + AsyncWrite + Unpin + std::fmt::Debug + Send,
{
    match client.read_response().await {
        Some(Ok(_)) => Ok(()),
        None => Err(RetrievalError::Connection(
            "connection closed before greeting".to_string(),
        )),
        Some(Err(e)) => Err(RetrievalError::Connection(format!(
            "failed to read greeting: {e}"
        ))),
    }
}

fn protocol_error(e: async_imap::error::Error) -> RetrievalError {
    RetrievalError::Protocol(e.to_string())
}

/// `SEARCH` criteria for messages on or after `since` (RFC 3501 date).
fn search_query(since: NaiveDate) -> String {
    format!("SINCE {}", since.format("%-d-%b-%Y"))
}

/// Compress matched sequence numbers into an ascending IMAP sequence set.
fn sequence_set(ids: &HashSet<u32>) -> Option<String> {
    let mut sorted: Vec<u32> = ids.iter().copied().collect();
    sorted.sort_unstable();

    let mut ranges: Vec<String> = Vec::new();
    let mut iter = sorted.into_iter();
    let mut start = iter.next()?;
    let mut end = start;

    for id in iter {
        if id == end + 1 {
            end = id;
            continue;
        }
        ranges.push(format_range(start, end));
        start = id;
        end = id;
    }
    ranges.push(format_range(start, end));

    Some(ranges.join(","))
}

fn format_range(start: u32, end: u32) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}:{end}")
    }
}

fn create_tls_connector() -> Result<TlsConnector, RetrievalError> {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| RetrievalError::Connection(e.to_string()))?
    .with_root_certificates(root_store)
    .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}
