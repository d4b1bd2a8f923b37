//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` registry with an env filter and either a
//! human-readable or a JSON formatter. `RUST_LOG` wins over the configured
//! level when set.

use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Tracing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Log level or filter directive (e.g. "info", "gateway_security=debug")
    pub log_level: String,
    /// Output format
    pub format: LogFormat,
    /// Include event targets
    pub with_target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "llm-metering-gateway".to_string(),
            log_level: "info".to_string(),
            format: LogFormat::Text,
            with_target: true,
        }
    }
}

impl TracingConfig {
    /// Create a new tracing configuration
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the log level
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the output format
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Build the env filter, preferring `RUST_LOG`.
    ///
    /// # Errors
    /// Returns error if the configured directive does not parse
    pub fn filter(&self) -> Result<EnvFilter, TracingError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.log_level)
                .map_err(|e| TracingError::InvalidFilter(e.to_string())),
        }
    }
}

/// Initialize tracing with the given configuration
///
/// # Errors
/// Returns error if the filter is invalid or a global subscriber is already set
pub fn init_tracing(config: &TracingConfig) -> Result<(), TracingError> {
    let filter = config.filter()?;

    let fmt_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(config.with_target)
            .boxed(),
        LogFormat::Text => fmt::layer().with_target(config.with_target).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .try_init()
        .map_err(|e| TracingError::Init(e.to_string()))?;

    info!(
        service = %config.service_name,
        format = ?config.format,
        "Tracing initialized"
    );

    Ok(())
}

/// Tracing initialization error
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// Failed to initialize tracing
    #[error("Failed to initialize tracing: {0}")]
    Init(String),
    /// Log level directive did not parse
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
}

/// Create a span for one metered request
#[macro_export]
macro_rules! metering_span {
    ($request_id:expr, $path:expr) => {
        tracing::info_span!(
            "metered_request",
            request_id = %$request_id,
            path = %$path,
        )
    };
}
