//! Mail module for mailgate.
//!
//! This module provides the two mail operations behind the gateway:
//! - Outbound dispatch through an SMTP relay
//! - Header summaries of a remote IMAP inbox
//!
//! Both use a fixed operational account from configuration and open a fresh
//! connection per request.

mod dispatch;
mod imap;
mod retrieve;
mod smtp;
mod types;

pub use dispatch::{DispatchError, MailDispatcher, MailRelay};
pub use imap::ImapMailbox;
pub use retrieve::{summarize_header, MailRetriever, MailboxSource, RetrievalError};
pub use smtp::SmtpRelay;
pub use types::{
    FetchedHeader, MailboxSummary, MessageSummary, OutboundMessage, DEFAULT_LOOKBACK_DAYS,
    NO_SUBJECT, UNKNOWN_DATE, UNKNOWN_SENDER,
};
