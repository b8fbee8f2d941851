//! Response DTOs for Web API.

use serde::Serialize;

use crate::mail::MessageSummary;

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer session token.
    pub token: String,
}

/// One inbox entry.
#[derive(Debug, Serialize)]
pub struct EmailSummaryResponse {
    /// Subject line.
    pub subject: String,
    /// Sender.
    pub from: String,
    /// Date header.
    pub date: String,
}

impl From<MessageSummary> for EmailSummaryResponse {
    fn from(summary: MessageSummary) -> Self {
        Self {
            subject: summary.subject,
            from: summary.from,
            date: summary.date,
        }
    }
}
