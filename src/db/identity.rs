//! Identity model for mailgate.

/// A registered principal.
///
/// Identities are immutable once created: there is no update or delete path.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Identity {
    /// Stable internal reference embedded in session tokens.
    pub id: i64,
    /// Unique login key (an email address, compared case-insensitively).
    pub identity_key: String,
    /// Salted one-way password hash (Argon2 PHC string).
    pub password_hash: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// Data required to insert a new identity.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    /// Unique login key.
    pub identity_key: String,
    /// Already-hashed password.
    pub password_hash: String,
}

impl NewIdentity {
    /// Create a new identity record.
    pub fn new(identity_key: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            identity_key: identity_key.into(),
            password_hash: password_hash.into(),
        }
    }
}
