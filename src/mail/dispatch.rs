//! Outbound mail dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::Mailbox;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::types::OutboundMessage;
use crate::auth::AuthenticatedIdentity;

/// Dispatch errors.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Recipient is not a valid mailbox address.
    #[error("invalid recipient address: {0}")]
    InvalidAddress(String),

    /// Configured sender is not a valid mailbox address.
    #[error("invalid sender address: {0}")]
    InvalidSender(String),

    /// Relay refused the message or could not be reached.
    #[error("relay transport error: {0}")]
    Transport(String),
}

/// Something that can hand a message to a mail relay.
#[async_trait]
pub trait MailRelay: Send + Sync {
    /// Deliver `message` to the relay.
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), DispatchError>;
}

/// Sends mail on behalf of authenticated callers.
///
/// Every message goes out from the configured operational account regardless
/// of which identity asked for it.
pub struct MailDispatcher {
    relay: Arc<dyn MailRelay>,
    sessions: Arc<Semaphore>,
}

impl MailDispatcher {
    /// Create a dispatcher over `relay`, sharing the `sessions` limit.
    pub fn new(relay: Arc<dyn MailRelay>, sessions: Arc<Semaphore>) -> Self {
        Self { relay, sessions }
    }

    /// Send a plain-text message.
    ///
    /// The recipient is checked before any connection is opened.
    pub async fn send(
        &self,
        sender: &AuthenticatedIdentity,
        message: OutboundMessage,
    ) -> Result<(), DispatchError> {
        message
            .recipient
            .parse::<Mailbox>()
            .map_err(|e| DispatchError::InvalidAddress(format!("{}: {e}", message.recipient)))?;

        let _permit = self
            .sessions
            .acquire()
            .await
            .map_err(|_| DispatchError::Transport("mail session limiter closed".to_string()))?;

        match self.relay.deliver(&message).await {
            Ok(()) => {
                info!(
                    identity_id = sender.id,
                    recipient = %message.recipient,
                    "Message dispatched"
                );
                Ok(())
            }
            Err(e) => {
                warn!(identity_id = sender.id, "Message dispatch failed: {}", e);
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for MailDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailDispatcher")
            .field("available_sessions", &self.sessions.available_permits())
            .finish()
    }
}
