//! # Gateway Config
//!
//! Top-level configuration for the metering gateway.
//!
//! Configuration is read from a YAML or TOML file, then overridden by
//! `GATEWAY_`-prefixed environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `GATEWAY_LOG_LEVEL` | `logging.log_level` |
//! | `GATEWAY_LOG_FORMAT` | `logging.format` (`text` or `json`) |
//! | `GATEWAY_ENCRYPTION_KEY` | `security.encryption.key`, enables encryption |
//! | `GATEWAY_SETTINGS_CACHE_TTL` | `security.settings_cache_ttl` |
//! | `GATEWAY_ROTATION_SEED` | `security.rotation.seed` |
//! | `GATEWAY_REQUEST_TIMEOUT` | `pipeline.request_timeout` |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use gateway_security::config::EncryptionConfig;
use gateway_security::SecurityConfig;
use gateway_telemetry::{LogFormat, PriceTable, TracingConfig};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "GATEWAY_";

/// Default time budget for authorization plus validation.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file did not parse.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// File extension is neither YAML nor TOML.
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// Environment override has an invalid value.
    #[error("invalid value for {var}: {message}")]
    Env {
        /// Variable name
        var: String,
        /// What was wrong
        message: String,
    },

    /// Configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<gateway_security::SecurityError> for ConfigError {
    fn from(err: gateway_security::SecurityError) -> Self {
        Self::Invalid(err.to_string())
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Logging
    pub logging: TracingConfig,
    /// Credential and secret handling
    pub security: SecurityConfig,
    /// Price table overrides
    pub pricing: PricingConfig,
    /// Request pipeline
    pub pipeline: PipelineConfig,
}

/// Price overrides merged over the built-in tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// OpenAI overrides, USD per 1,000 tokens
    pub openai: PriceTable,
    /// Anthropic overrides, USD per 1,000,000 tokens
    pub anthropic: PriceTable,
}

impl PricingConfig {
    /// Built-in OpenAI table with overrides applied.
    #[must_use]
    pub fn openai_prices(&self) -> PriceTable {
        let mut prices = PriceTable::openai();
        prices.merge(&self.openai);
        prices
    }

    /// Built-in Anthropic table with overrides applied.
    #[must_use]
    pub fn anthropic_prices(&self) -> PriceTable {
        let mut prices = PriceTable::anthropic();
        prices.merge(&self.anthropic);
        prices
    }
}

/// Request pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Time budget for authorization plus validation
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    /// Load a config file, YAML by `.yaml`/`.yml`, TOML by `.toml`.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let config = match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml(&contents)?,
            "toml" => Self::from_toml(&contents)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parse YAML.
    ///
    /// # Errors
    /// Returns error if the document does not parse
    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse TOML.
    ///
    /// # Errors
    /// Returns error if the document does not parse
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Defaults overridden by the process environment.
    ///
    /// # Errors
    /// Returns error if an override has an invalid value
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `GATEWAY_` overrides read through `lookup`.
    ///
    /// # Errors
    /// Returns error if an override has an invalid value
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{ENV_PREFIX}{suffix}");
            lookup(&name).map(|value| (name, value))
        };

        if let Some((_, level)) = var("LOG_LEVEL") {
            self.logging.log_level = level;
        }
        if let Some((name, format)) = var("LOG_FORMAT") {
            self.logging.format = match format.to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => return Err(env_error(name, "expected text or json")),
            };
        }
        if let Some((_, key)) = var("ENCRYPTION_KEY") {
            self.security.encryption = EncryptionConfig {
                enabled: true,
                key: Some(SecretString::new(key)),
            };
        }
        if let Some((name, ttl)) = var("SETTINGS_CACHE_TTL") {
            self.security.settings_cache_ttl =
                humantime::parse_duration(&ttl).map_err(|e| env_error(name, e))?;
        }
        if let Some((name, seed)) = var("ROTATION_SEED") {
            self.security.rotation.seed = Some(seed.parse().map_err(|e| env_error(name, e))?);
        }
        if let Some((name, timeout)) = var("REQUEST_TIMEOUT") {
            self.pipeline.request_timeout =
                humantime::parse_duration(&timeout).map_err(|e| env_error(name, e))?;
        }

        debug!("Environment overrides applied");
        Ok(self)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns error describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        self.security.validate()?;
        if self.pipeline.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "pipeline.request_timeout must be positive".to_string(),
            ));
        }
        let mut overrides = self.pricing.openai.rates().chain(self.pricing.anthropic.rates());
        if overrides.any(|rate| rate < 0.0) {
            return Err(ConfigError::Invalid("price overrides must not be negative".to_string()));
        }
        Ok(())
    }
}

fn env_error(var: String, message: impl std::fmt::Display) -> ConfigError {
    ConfigError::Env {
        var,
        message: message.to_string(),
    }
}
