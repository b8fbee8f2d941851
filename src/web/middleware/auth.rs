//! Bearer token authentication extractor.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

use crate::auth::{AuthenticatedIdentity, Unauthorized};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Extractor for authenticated callers.
///
/// Rejects the request before the handler body runs, so a handler taking
/// `AuthUser` never touches the mail servers for an unauthenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthenticatedIdentity);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| Unauthorized::MalformedHeader)?),
            None => None,
        };

        let identity = state.gate.authenticate(header).map_err(|reason| {
            tracing::debug!(reason = reason.reason(), "Request rejected");
            reason
        })?;

        Ok(AuthUser(identity))
    }
}
