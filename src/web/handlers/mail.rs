//! Mail handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use super::AppState;
use crate::mail::OutboundMessage;
use crate::web::dto::{EmailSummaryResponse, SendRequest, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

/// Body returned when the relay accepted the message.
pub const SENT: &str = "Email sent successfully";

/// POST /send - Send a plain-text message from the operational account.
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    ValidatedJson(req): ValidatedJson<SendRequest>,
) -> Result<&'static str, ApiError> {
    let message = OutboundMessage::new(req.to, req.subject, req.text);
    state.dispatcher.send(&identity, message).await?;
    Ok(SENT)
}

/// GET /emails - Summarize recent inbox messages.
pub async fn list_emails(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<EmailSummaryResponse>>, ApiError> {
    let summaries = state
        .retriever
        .list_recent(&identity, state.lookback_days)
        .await?;
    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}
