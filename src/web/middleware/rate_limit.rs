//! Rate limiting middleware.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use crate::web::error::ApiError;

/// Login limiter keyed by client IP.
pub type KeyedIpRateLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// How often idle client entries are dropped.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// State for login rate limiting.
#[derive(Clone)]
pub struct RateLimitState {
    /// Login limiter shared by every request.
    login_limiter: Arc<KeyedIpRateLimiter>,
    /// Whether `X-Forwarded-For` / `X-Real-IP` name the client.
    trust_proxy_headers: bool,
}

impl RateLimitState {
    /// Create a new rate limit state allowing `login_rate_limit` attempts per minute.
    pub fn new(login_rate_limit: u32) -> Self {
        let quota =
            Quota::per_minute(NonZeroU32::new(login_rate_limit).unwrap_or(NonZeroU32::MIN));
        Self::with_quota(quota)
    }

    fn with_quota(quota: Quota) -> Self {
        Self {
            login_limiter: Arc::new(RateLimiter::keyed(quota)),
            trust_proxy_headers: false,
        }
    }

    /// Take the client IP from proxy headers when `trust` is set.
    ///
    /// Only enable this behind a reverse proxy that overwrites those headers.
    pub fn with_trusted_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    /// Check if a login attempt is allowed for `ip`.
    pub fn check_login(&self, ip: &str) -> bool {
        self.login_limiter.check_key(&ip.to_string()).is_ok()
    }

    /// Number of tracked client IPs.
    pub fn tracked_clients(&self) -> usize {
        self.login_limiter.len()
    }

    /// Drop clients whose quota has fully replenished.
    pub fn cleanup(&self) {
        self.login_limiter.retain_recent();
        self.login_limiter.shrink_to_fit();
    }

    /// Start a background task that periodically calls [`cleanup`](Self::cleanup).
    ///
    /// The task ends once the last other handle to the state is dropped.
    pub fn start_cleanup_task(self: &Arc<Self>) {
        let state = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                match state.upgrade() {
                    Some(state) => state.cleanup(),
                    None => break,
                }
            }
        });
    }

    /// Extract the rate limit key for `req`.
    fn client_ip(&self, req: &Request<Body>) -> String {
        if self.trust_proxy_headers {
            if let Some(ip) = forwarded_ip(req) {
                return ip;
            }
        }

        if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
            return addr.ip().to_string();
        }

        "unknown".to_string()
    }
}

/// Client IP named by a reverse proxy.
fn forwarded_ip(req: &Request<Body>) -> Option<String> {
    // First hop of X-Forwarded-For
    if let Some(forwarded) = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = forwarded.split(',').next() {
            let ip = ip.trim();
            if !ip.is_empty() {
                return Some(ip.to_string());
            }
        }
    }

    req.headers()
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

/// Rate limiting middleware for the login endpoint.
pub async fn login_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = state.client_ip(&req);

    if !state.check_login(&ip) {
        tracing::warn!(ip = %ip, "Login rate limit exceeded");
        return ApiError::too_many_requests("Too many login attempts. Please try again later.")
            .into_response();
    }

    next.run(req).await
}
