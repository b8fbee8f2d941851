//! Input validation for registration and login.

use thiserror::Error;

/// Maximum password length in bytes.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum identity key (email address) length.
pub const MAX_IDENTITY_KEY_LENGTH: usize = 254;

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Identity key is empty.
    #[error("identity key is required")]
    IdentityKeyEmpty,

    /// Identity key is too long.
    #[error("identity key must be at most {MAX_IDENTITY_KEY_LENGTH} characters")]
    IdentityKeyTooLong,

    /// Identity key is not an email address.
    #[error("identity key must be an email address")]
    IdentityKeyInvalidFormat,

    /// Password is empty.
    #[error("password is required")]
    PasswordEmpty,

    /// Password is too long.
    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    PasswordTooLong,
}

/// Validate an identity key.
///
/// The key must be an email address: exactly one `@`, a non-empty local part,
/// a dotted domain with no empty labels, and no whitespace. This is
/// deliberately loose; the relay is the authority on deliverability.
///
/// # Examples
///
/// ```
/// use mailgate::auth::validation::validate_identity_key;
///
/// assert!(validate_identity_key("a@x.com").is_ok());
/// assert!(validate_identity_key("not-an-email").is_err());
/// ```
pub fn validate_identity_key(identity_key: &str) -> Result<(), ValidationError> {
    if identity_key.is_empty() {
        return Err(ValidationError::IdentityKeyEmpty);
    }
    if identity_key.len() > MAX_IDENTITY_KEY_LENGTH {
        return Err(ValidationError::IdentityKeyTooLong);
    }
    if identity_key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::IdentityKeyInvalidFormat);
    }

    let Some((local, domain)) = identity_key.split_once('@') else {
        return Err(ValidationError::IdentityKeyInvalidFormat);
    };
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(ValidationError::IdentityKeyInvalidFormat);
    }
    if domain.split('.').any(|label| label.is_empty()) {
        return Err(ValidationError::IdentityKeyInvalidFormat);
    }

    Ok(())
}

/// Validate a plaintext password.
///
/// Any non-empty password up to [`MAX_PASSWORD_LENGTH`] bytes is accepted.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::PasswordEmpty);
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooLong);
    }
    Ok(())
}
