//! Mail types for mailgate.

use chrono::{DateTime, Utc};

/// Placeholder for a message without a `Subject` header.
pub const NO_SUBJECT: &str = "No Subject";

/// Placeholder for a message without a usable `From` header.
pub const UNKNOWN_SENDER: &str = "Unknown Sender";

/// Placeholder for a message without a usable `Date` header.
pub const UNKNOWN_DATE: &str = "Unknown Date";

/// Default mailbox lookback window in days.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 356;

/// A message to hand to the relay. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Recipient address.
    pub recipient: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

impl OutboundMessage {
    /// Create a new outbound message.
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Header summary of one mailbox message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    /// Decoded subject, or [`NO_SUBJECT`].
    pub subject: String,
    /// First sender, or [`UNKNOWN_SENDER`].
    pub from: String,
    /// Date header, or [`UNKNOWN_DATE`].
    pub date: String,
}

/// Message summaries in the order the mailbox returned them.
pub type MailboxSummary = Vec<MessageSummary>;

/// Raw header block of one message as fetched from the mailbox.
#[derive(Debug, Clone, Default)]
pub struct FetchedHeader {
    /// Server-side arrival time, when reported.
    pub internal_date: Option<DateTime<Utc>>,
    /// Header bytes (RFC 5322 header section).
    pub raw: Vec<u8>,
}
