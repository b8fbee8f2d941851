//! Authentication handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use super::AppState;
use crate::web::dto::{CredentialsRequest, LoginResponse, ValidatedJson};
use crate::web::error::ApiError;

/// Body returned by a successful registration.
pub const REGISTERED: &str = "User registered";

/// POST /register - Create an identity.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CredentialsRequest>,
) -> Result<&'static str, ApiError> {
    let identity = state.store.register(&req.identity_key, &req.password).await?;
    tracing::debug!(identity_id = identity.id, "Registration complete");
    Ok(REGISTERED)
}

/// POST /login - Exchange credentials for a session token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CredentialsRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session = state.gate.login(&req.identity_key, &req.password).await?;
    Ok(Json(LoginResponse {
        token: session.token,
    }))
}
