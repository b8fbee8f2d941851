//! Router configuration for Web API.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{list_emails, login, register, send_email, AppState};
use super::middleware::{login_rate_limit, RateLimitState};

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, rate_limit: Arc<RateLimitState>) -> Router {
    let login_routes = Router::new()
        .route("/login", post(login))
        .layer(middleware::from_fn(move |req, next| {
            let state = rate_limit.clone();
            login_rate_limit(state, req, next)
        }));

    Router::new()
        .route("/register", post(register))
        .merge(login_routes)
        .route("/send", post(send_email))
        .route("/emails", get(list_emails))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state)
        .merge(create_health_router())
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
