//! Inbox header retrieval.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use mail_parser::{Addr, HeaderName, Message, MessageParser};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::types::{
    FetchedHeader, MailboxSummary, MessageSummary, NO_SUBJECT, UNKNOWN_DATE, UNKNOWN_SENDER,
};
use crate::auth::AuthenticatedIdentity;

/// Retrieval errors.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Could not reach the mailbox server.
    #[error("mailbox connection failed: {0}")]
    Connection(String),

    /// The server rejected a command.
    #[error("mailbox protocol error: {0}")]
    Protocol(String),

    /// The whole operation ran past its deadline.
    #[error("mailbox operation timed out after {0:?}")]
    Timeout(Duration),
}

/// A remote inbox that can list message headers.
#[async_trait]
pub trait MailboxSource: Send + Sync {
    /// Fetch the header block of every inbox message that arrived on or
    /// after `since`, in the order the server returns them.
    async fn fetch_headers_since(
        &self,
        since: NaiveDate,
    ) -> Result<Vec<FetchedHeader>, RetrievalError>;
}

/// Lists recent inbox messages for authenticated callers.
///
/// The inbox is the configured operational account's; the caller's identity
/// only gates access.
pub struct MailRetriever {
    source: Arc<dyn MailboxSource>,
    sessions: Arc<Semaphore>,
    timeout: Duration,
}

impl MailRetriever {
    /// Create a retriever over `source`, sharing the `sessions` limit.
    ///
    /// `timeout` bounds each call end to end, including the wait for a session.
    pub fn new(source: Arc<dyn MailboxSource>, sessions: Arc<Semaphore>, timeout: Duration) -> Self {
        Self {
            source,
            sessions,
            timeout,
        }
    }

    /// Summarize messages received within the last `lookback_days` days.
    pub async fn list_recent(
        &self,
        identity: &AuthenticatedIdentity,
        lookback_days: u32,
    ) -> Result<MailboxSummary, RetrievalError> {
        self.list_recent_at(identity, lookback_days, Utc::now()).await
    }

    /// Summarize messages received within `lookback_days` days of `now`.
    pub async fn list_recent_at(
        &self,
        identity: &AuthenticatedIdentity,
        lookback_days: u32,
        now: DateTime<Utc>,
    ) -> Result<MailboxSummary, RetrievalError> {
        let cutoff = now - chrono::Duration::days(i64::from(lookback_days));
        // SINCE compares calendar days in the server's zone; widen by a day and
        // filter on the exact cutoff below.
        let since = (cutoff - chrono::Duration::days(1)).date_naive();

        let fetch = async {
            let _permit = self
                .sessions
                .acquire()
                .await
                .map_err(|_| RetrievalError::Connection("mail session limiter closed".to_string()))?;
            self.source.fetch_headers_since(since).await
        };

        let headers = match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Ok(headers)) => headers,
            Ok(Err(e)) => {
                warn!(identity_id = identity.id, "Mailbox retrieval failed: {}", e);
                return Err(e);
            }
            Err(_) => {
                warn!(identity_id = identity.id, "Mailbox retrieval timed out");
                return Err(RetrievalError::Timeout(self.timeout));
            }
        };

        let summaries: MailboxSummary = headers
            .into_iter()
            .filter(|h| h.internal_date.map_or(true, |d| d >= cutoff))
            .map(|h| summarize_header(&h.raw))
            .collect();

        info!(
            identity_id = identity.id,
            count = summaries.len(),
            "Mailbox summarized"
        );
        Ok(summaries)
    }
}

impl std::fmt::Debug for MailRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailRetriever")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Build a summary from a raw header block.
///
/// A present header that cannot be parsed is reported as its raw text. Missing
/// fields fall back to placeholders; this never fails.
pub fn summarize_header(raw: &[u8]) -> MessageSummary {
    let parsed = MessageParser::default().parse_headers(raw);

    let subject = parsed
        .as_ref()
        .and_then(|m| m.subject())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| NO_SUBJECT.to_string(), str::to_string);

    let from = parsed
        .as_ref()
        .and_then(|m| {
            m.from()
                .and_then(|a| a.first())
                .and_then(format_addr)
                .or_else(|| raw_header(m, HeaderName::From))
        })
        .unwrap_or_else(|| UNKNOWN_SENDER.to_string());

    let date = parsed
        .as_ref()
        .and_then(|m| {
            m.date()
                .and_then(format_date)
                .or_else(|| raw_header(m, HeaderName::Date))
        })
        .unwrap_or_else(|| UNKNOWN_DATE.to_string());

    MessageSummary {
        subject,
        from,
        date,
    }
}

/// Unfolded, trimmed header value as it appeared on the wire.
fn raw_header(message: &Message<'_>, name: HeaderName<'static>) -> Option<String> {
    let value = message
        .header_raw(name)?
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!value.is_empty()).then_some(value)
}

fn format_date(date: &mail_parser::DateTime) -> Option<String> {
    let offset_secs = (i32::from(date.tz_hour) * 3600 + i32::from(date.tz_minute) * 60)
        * if date.tz_before_gmt { -1 } else { 1 };
    let offset = FixedOffset::east_opt(offset_secs)?;
    let local = NaiveDate::from_ymd_opt(
        i32::from(date.year),
        u32::from(date.month),
        u32::from(date.day),
    )?
    .and_hms_opt(
        u32::from(date.hour),
        u32::from(date.minute),
        u32::from(date.second),
    )?;
    let dated = offset.from_local_datetime(&local).single()?;
    Some(dated.to_rfc2822())
}

fn format_addr(addr: &Addr<'_>) -> Option<String> {
    let name = addr.name().map(str::trim).filter(|s| !s.is_empty());
    let address = addr.address().map(str::trim).filter(|s| !s.is_empty());

    match (name, address) {
        (Some(name), Some(address)) => Some(format!("{name} <{address}>")),
        (None, Some(address)) => Some(address.to_string()),
        (Some(name), None) => Some(name.to_string()),
        (None, None) => None,
    }
}
