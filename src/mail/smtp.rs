//! SMTP relay backed by lettre.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use super::dispatch::{DispatchError, MailRelay};
use super::types::OutboundMessage;
use crate::config::{RelayConfig, RelaySecurity};

/// Relay that opens a fresh SMTP session per message.
#[derive(Debug, Clone)]
pub struct SmtpRelay {
    config: RelayConfig,
}

impl SmtpRelay {
    /// Create a relay for the configured operational account.
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Build the RFC 5322 message for `message`.
    pub fn build_message(&self, message: &OutboundMessage) -> Result<Message, DispatchError> {
        let from: Mailbox = self
            .config
            .sender()
            .parse()
            .map_err(|e| DispatchError::InvalidSender(format!("{}: {e}", self.config.sender())))?;
        let to: Mailbox = message
            .recipient
            .parse()
            .map_err(|e| DispatchError::InvalidAddress(format!("{}: {e}", message.recipient)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| DispatchError::Transport(e.to_string()))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, DispatchError> {
        let host = self.config.host.as_str();
        let builder = match self.config.security {
            RelaySecurity::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
            RelaySecurity::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| DispatchError::Transport(e.to_string()))?,
            RelaySecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| DispatchError::Transport(e.to_string()))?,
        };

        let mut builder = builder
            .port(self.config.port)
            .timeout(Some(Duration::from_secs(self.config.timeout_secs)));

        if !self.config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ));
        }

        Ok(builder.build())
    }
}

#[async_trait]
impl MailRelay for SmtpRelay {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), DispatchError> {
        let email = self.build_message(message)?;
        let transport = self.transport()?;

        debug!(
            host = %self.config.host,
            port = self.config.port,
            "Opening SMTP session"
        );
        transport
            .send(email)
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        Ok(())
    }
}
