//! Security error types.

use gateway_core::{GatewayError, StoreError};

/// Result type for security operations.
pub type Result<T> = std::result::Result<T, SecurityError>;

/// Security error type.
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    /// Encryption error.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Decryption error.
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// Malformed custom-provider auth template.
    #[error("invalid auth template: {0}")]
    InvalidTemplate(String),

    /// Auth location other than `header` or `query`.
    #[error("unknown auth location: {0}")]
    UnknownAuthLocation(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SecurityError {
    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if error is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidTemplate(_) | Self::UnknownAuthLocation(_))
    }

    /// Get HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidTemplate(_) | Self::UnknownAuthLocation(_) => 400,
            Self::Encryption(_) | Self::Decryption(_) | Self::Config(_) => 500,
        }
    }
}

impl From<SecurityError> for GatewayError {
    fn from(err: SecurityError) -> Self {
        match err {
            SecurityError::InvalidTemplate(_) | SecurityError::UnknownAuthLocation(_) => {
                Self::validation(err.to_string())
            }
            SecurityError::Encryption(_)
            | SecurityError::Decryption(_)
            | SecurityError::Config(_) => Self::internal(err.to_string()),
        }
    }
}

impl From<SecurityError> for StoreError {
    fn from(err: SecurityError) -> Self {
        Self::backend(err.to_string())
    }
}
