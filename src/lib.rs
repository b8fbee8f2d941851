//! mailgate - authenticated mail gateway
//!
//! An HTTP service that registers identities, issues bearer session tokens,
//! and lets authenticated callers send mail through an SMTP relay and list
//! recent messages from an IMAP inbox.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod mail;
pub mod web;

pub use auth::{
    AuthError, AuthGate, AuthenticatedIdentity, CredentialStore, SessionToken, StoreError,
    Unauthorized,
};
pub use config::Config;
pub use db::{Database, Identity};
pub use error::{GatewayError, Result};
pub use mail::{MailDispatcher, MailRetriever, MessageSummary, OutboundMessage};
pub use web::{AppState, WebServer};
