//! Authentication module for mailgate.
//!
//! Credential storage, password hashing, and the session token gate that
//! protects the mail endpoints.

mod credentials;
mod gate;
mod password;
pub mod validation;

pub use credentials::{CredentialStore, StoreError};
pub use gate::{
    AuthError, AuthGate, AuthenticatedIdentity, SessionClaims, SessionToken, Unauthorized,
    TOKEN_TTL_SECS,
};
pub use password::{hash_password, verify_password, PasswordError};
pub use validation::ValidationError;
