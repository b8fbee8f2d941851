//! Request DTOs for Web API.

use serde::Deserialize;
use validator::Validate;

use super::validation::single_line;

/// Registration and login request.
#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsRequest {
    /// Identity key (an email address).
    #[serde(default, alias = "email")]
    #[validate(length(min = 1, message = "Identity key is required"))]
    pub identity_key: String,
    /// Plaintext password.
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Outbound mail request.
#[derive(Debug, Deserialize, Validate)]
pub struct SendRequest {
    /// Recipient address.
    #[serde(default)]
    #[validate(length(min = 1, message = "Recipient is required"))]
    pub to: String,
    /// Subject line.
    #[serde(default)]
    #[validate(custom(function = "single_line"))]
    pub subject: String,
    /// Plain-text body.
    #[serde(default)]
    pub text: String,
}
