//! Error types for the metering pipeline.
//!
//! Every failure the pipeline reports falls into one of a small set of kinds so
//! callers can map them onto distinct responses (unauthorized, not found,
//! too many requests, ...). Collaborator failures are kept opaque.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result alias used across the gateway crates.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Result alias for collaborator (cache/store/counter) calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Which limit expired a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationKind {
    /// The key outlived its time-to-live.
    TtlExpiration,
    /// The lifetime cost limit was reached.
    CostLimitExpiration,
    /// The lifetime request count limit was reached.
    RequestsLimitExpiration,
}

impl std::fmt::Display for ExpirationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TtlExpiration => write!(f, "ttl"),
            Self::CostLimitExpiration => write!(f, "cost-limit"),
            Self::RequestsLimitExpiration => write!(f, "requests-limit"),
        }
    }
}

/// Pipeline error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// Missing, unknown, revoked or unauthorized credential.
    #[error("{0}")]
    Auth(String),

    /// Unknown route or other missing resource.
    #[error("{0}")]
    NotFound(String),

    /// Malformed input or configuration.
    #[error("{0}")]
    Validation(String),

    /// Request rate over a time window exceeded.
    #[error("{0}")]
    RateLimit(String),

    /// Spend over a time window exceeded.
    #[error("{0}")]
    CostLimit(String),

    /// A lifetime limit expired the key.
    #[error("{message}")]
    Expiration {
        /// Human readable message
        message: String,
        /// Which limit triggered
        kind: ExpirationKind,
    },

    /// Model or category missing from a price table.
    #[error("{model} is not supported for {category} cost estimation")]
    ModelNotSupported {
        /// Model name as supplied by the caller
        model: String,
        /// Price table category
        category: String,
    },

    /// Opaque collaborator failure.
    #[error("{0}")]
    Collaborator(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// The inbound request was cancelled before the pipeline finished.
    #[error("request cancelled")]
    Cancelled,

    /// The pipeline exceeded its time budget.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl GatewayError {
    /// Create an auth error.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a rate limit error.
    pub fn rate_limit(msg: impl Into<String>) -> Self {
        Self::RateLimit(msg.into())
    }

    /// Create a cost limit error.
    pub fn cost_limit(msg: impl Into<String>) -> Self {
        Self::CostLimit(msg.into())
    }

    /// Create an expiration error.
    pub fn expiration(msg: impl Into<String>, kind: ExpirationKind) -> Self {
        Self::Expiration {
            message: msg.into(),
            kind,
        }
    }

    /// Create a model-not-supported error.
    pub fn model_not_supported(model: impl Into<String>, category: impl Into<String>) -> Self {
        Self::ModelNotSupported {
            model: model.into(),
            category: category.into(),
        }
    }

    /// Create an opaque collaborator error.
    pub fn collaborator(msg: impl Into<String>) -> Self {
        Self::Collaborator(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Expiration sub-kind, if this is an expiration error.
    #[must_use]
    pub fn expiration_kind(&self) -> Option<ExpirationKind> {
        match self {
            Self::Expiration { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Check if error is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Auth(_)
                | Self::NotFound(_)
                | Self::Validation(_)
                | Self::RateLimit(_)
                | Self::CostLimit(_)
                | Self::Expiration { .. }
                | Self::ModelNotSupported { .. }
                | Self::Cancelled
        )
    }

    /// Get HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Auth(_) => 401,
            Self::NotFound(_) => 404,
            Self::Validation(_) | Self::ModelNotSupported { .. } => 400,
            Self::RateLimit(_) | Self::CostLimit(_) | Self::Expiration { .. } => 429,
            Self::Cancelled => 499,
            Self::Timeout(_) => 504,
            Self::Collaborator(_) | Self::Internal(_) => 500,
        }
    }
}

/// Failure reported by an injected collaborator.
///
/// A clean "not found" is not an error: lookups return `Ok(None)` instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Backend could not be reached or answered with an error.
    #[error("store backend error: {0}")]
    Backend(String),

    /// Stored value could not be decoded.
    #[error("store serialization error: {0}")]
    Serialization(String),

    /// A write conflicted with the current state (e.g. unknown id on update).
    #[error("store conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Create a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        Self::Collaborator(err.to_string())
    }
}
