//! API handlers for mailgate.

pub mod auth;
pub mod mail;

pub use auth::*;
pub use mail::*;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::auth::{AuthGate, CredentialStore};
use crate::config::Config;
use crate::db::Database;
use crate::mail::{ImapMailbox, MailDispatcher, MailRetriever, SmtpRelay};
use crate::{GatewayError, Result};

/// Application state shared across handlers.
///
/// Built once at startup; every field is read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    /// Credential store used by registration.
    pub store: Arc<CredentialStore>,
    /// Session token gate.
    pub gate: Arc<AuthGate>,
    /// Outbound mail dispatcher.
    pub dispatcher: Arc<MailDispatcher>,
    /// Inbox retriever.
    pub retriever: Arc<MailRetriever>,
    /// Lookback window for `GET /emails`, in days.
    pub lookback_days: u32,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        store: Arc<CredentialStore>,
        gate: Arc<AuthGate>,
        dispatcher: Arc<MailDispatcher>,
        retriever: Arc<MailRetriever>,
    ) -> Self {
        Self {
            store,
            gate,
            dispatcher,
            retriever,
            lookback_days: crate::mail::DEFAULT_LOOKBACK_DAYS,
        }
    }

    /// Wire the production relay and mailbox from `config`.
    ///
    /// SMTP and IMAP sessions share one concurrency limit.
    pub fn from_config(config: &Config, db: Database) -> Result<Self> {
        let store = Arc::new(CredentialStore::new(db));
        let gate = Arc::new(AuthGate::new(store.clone(), &config.auth.jwt_secret));
        let sessions = Arc::new(Semaphore::new(config.mail.max_concurrent_sessions));

        let relay = Arc::new(SmtpRelay::new(config.relay.clone()));
        let mailbox = ImapMailbox::new(config.mailbox.clone())
            .map_err(|e| GatewayError::Config(format!("mailbox TLS setup failed: {e}")))?;

        let dispatcher = Arc::new(MailDispatcher::new(relay, sessions.clone()));
        let retriever = Arc::new(MailRetriever::new(
            Arc::new(mailbox),
            sessions,
            Duration::from_secs(config.mailbox.timeout_secs),
        ));

        Ok(Self::new(store, gate, dispatcher, retriever)
            .with_lookback_days(config.mailbox.lookback_days))
    }

    /// Set the `GET /emails` lookback window.
    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }
}
