//! Session token issuance and verification.
//!
//! Tokens are HS256 JWTs with a fixed one-hour lifetime. Nothing is stored
//! server-side: a token is valid exactly when its signature verifies and the
//! current time is before its expiry.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::credentials::{CredentialStore, StoreError};
use crate::db::Identity;

/// Session token lifetime in seconds.
pub const TOKEN_TTL_SECS: i64 = 3600;

/// JWT claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (identity ID).
    pub sub: String,
    /// Identity key at issuance.
    pub identity_key: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
    /// JWT ID.
    pub jti: String,
}

/// A freshly minted session token.
#[derive(Debug, Clone)]
pub struct SessionToken {
    /// Encoded JWT.
    pub token: String,
    /// Issuance time.
    pub issued_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

/// The principal behind a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    /// Identity ID.
    pub id: i64,
    /// Identity key.
    pub identity_key: String,
}

/// Why a presented credential was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unauthorized {
    /// No `Authorization` header.
    #[error("authorization header is missing")]
    MissingHeader,
    /// Header is not `Bearer <token>`.
    #[error("authorization header is malformed")]
    MalformedHeader,
    /// Token failed to decode or its signature did not verify.
    #[error("token is invalid")]
    InvalidToken,
    /// Token is past its expiry.
    #[error("token has expired")]
    Expired,
}

impl Unauthorized {
    /// Short machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            Unauthorized::MissingHeader => "missing_header",
            Unauthorized::MalformedHeader => "malformed_header",
            Unauthorized::InvalidToken => "invalid_token",
            Unauthorized::Expired => "expired",
        }
    }
}

/// Login errors.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Credential check failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Token could not be signed.
    #[error("failed to sign session token: {0}")]
    Signing(String),
}

/// Issues and verifies bearer session tokens.
pub struct AuthGate {
    store: Arc<CredentialStore>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthGate {
    /// Create a gate signing with `secret`.
    ///
    /// The secret is fixed for the life of the process.
    pub fn new(store: Arc<CredentialStore>, secret: &str) -> Self {
        // Expiry is checked against an explicit clock in `verify_token_at`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            store,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Check credentials and mint a session token.
    pub async fn login(&self, identity_key: &str, password: &str) -> Result<SessionToken, AuthError> {
        let identity = self.store.verify(identity_key, password).await?;
        let token = self.issue_at(&identity, Utc::now())?;
        info!(identity_id = identity.id, "Session token issued");
        Ok(token)
    }

    /// Mint a token for `identity` as if issued at `now`.
    pub fn issue_at(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<SessionToken, AuthError> {
        let expires_at = now + Duration::seconds(TOKEN_TTL_SECS);
        let claims = SessionClaims {
            sub: identity.id.to_string(),
            identity_key: identity.identity_key.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(SessionToken {
            token,
            issued_at: now,
            expires_at,
        })
    }

    /// Verify a presented `Authorization` header value.
    pub fn authenticate(&self, header: Option<&str>) -> Result<AuthenticatedIdentity, Unauthorized> {
        self.authenticate_at(header, Utc::now())
    }

    /// Verify a presented `Authorization` header value against the clock `now`.
    pub fn authenticate_at(
        &self,
        header: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedIdentity, Unauthorized> {
        let header = header.ok_or(Unauthorized::MissingHeader)?;
        let token = parse_bearer(header)?;
        self.verify_token_at(token, now)
    }

    /// Verify a raw token against the clock `now`.
    pub fn verify_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedIdentity, Unauthorized> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| {
                debug!("Token validation failed: {}", e);
                Unauthorized::InvalidToken
            },
        )?;
        let claims = data.claims;

        if now.timestamp() >= claims.exp {
            return Err(Unauthorized::Expired);
        }

        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| Unauthorized::InvalidToken)?;

        Ok(AuthenticatedIdentity {
            id,
            identity_key: claims.identity_key,
        })
    }
}

/// Extract the token from `Bearer <token>`.
///
/// The scheme is matched case-insensitively; the token must be a single
/// non-empty word.
fn parse_bearer(header: &str) -> Result<&str, Unauthorized> {
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(Unauthorized::MalformedHeader)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("Bearer") || token.is_empty() || token.contains(' ') {
        return Err(Unauthorized::MalformedHeader);
    }
    Ok(token)
}
