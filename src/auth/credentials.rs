//! Credential store: registration and password verification.

use thiserror::Error;
use tracing::{debug, info};

use super::password::{hash_password, verify_dummy, verify_password, PasswordError};
use super::validation::{validate_identity_key, validate_password, ValidationError};
use crate::db::{Database, Identity, IdentityRepository, NewIdentity};
use crate::GatewayError;

/// Credential store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Input failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The identity key is already registered.
    #[error("identity already exists")]
    AlreadyExists,

    /// Unknown identity or wrong password; the two are never distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// Durable storage failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<GatewayError> for StoreError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::AlreadyExists(_) => StoreError::AlreadyExists,
            other => StoreError::Storage(other.to_string()),
        }
    }
}

/// Durable mapping from identity key to salted password hash.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    db: Database,
}

impl CredentialStore {
    /// Create a store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Register a new identity.
    ///
    /// The identity key is trimmed and must be an email address; the password
    /// must be non-empty. A key that is already registered (compared
    /// case-insensitively) yields [`StoreError::AlreadyExists`].
    pub async fn register(
        &self,
        identity_key: &str,
        password: &str,
    ) -> Result<Identity, StoreError> {
        let identity_key = identity_key.trim();
        validate_identity_key(identity_key)?;
        validate_password(password)?;

        let password = password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| StoreError::Hashing(e.to_string()))?
            .map_err(|e| match e {
                PasswordError::Invalid(v) => StoreError::Validation(v),
                other => StoreError::Hashing(other.to_string()),
            })?;

        let repo = IdentityRepository::new(self.db.pool());
        let identity = repo
            .create(&NewIdentity::new(identity_key, password_hash))
            .await?;

        info!(identity_id = identity.id, "Identity registered");
        Ok(identity)
    }

    /// Verify a login attempt.
    ///
    /// Returns the identity when the password matches. An unknown key and a
    /// wrong password both return [`StoreError::InvalidCredentials`], and both
    /// run one hash verification.
    pub async fn verify(&self, identity_key: &str, password: &str) -> Result<Identity, StoreError> {
        let identity_key = identity_key.trim();
        if identity_key.is_empty() {
            return Err(ValidationError::IdentityKeyEmpty.into());
        }
        if password.is_empty() {
            return Err(ValidationError::PasswordEmpty.into());
        }

        let repo = IdentityRepository::new(self.db.pool());
        let identity = repo.get_by_key(identity_key).await?;

        let password = password.to_owned();
        let stored_hash = identity.as_ref().map(|i| i.password_hash.clone());
        let matched = tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => verify_password(&password, &hash).is_ok(),
            None => {
                verify_dummy(&password);
                false
            }
        })
        .await
        .map_err(|e| StoreError::Hashing(e.to_string()))?;

        match identity {
            Some(identity) if matched => Ok(identity),
            _ => {
                debug!("Credential verification failed");
                Err(StoreError::InvalidCredentials)
            }
        }
    }
}
