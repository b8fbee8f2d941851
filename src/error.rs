//! Error types for mailgate.

use thiserror::Error;

/// Common error type for mailgate.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    ///
    /// Raised when the pool cannot be opened at startup; the binary treats it as fatal.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unique constraint violated.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for GatewayError {
    fn from(e: sqlx::Error) -> Self {
        GatewayError::Database(e.to_string())
    }
}

/// Result type alias for mailgate operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
