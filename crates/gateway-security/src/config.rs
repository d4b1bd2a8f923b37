//! Security configuration.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::crypto::SecretCipher;
use crate::error::{Result, SecurityError};
use crate::rotation::{RandomRotation, RotationSource, SeededRotation};
use crate::settings::DEFAULT_SETTINGS_CACHE_TTL;

/// Security configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Provider secret encryption.
    #[serde(default)]
    pub encryption: EncryptionConfig,

    /// Lifetime of cached provider settings.
    #[serde(with = "humantime_serde", default = "default_settings_cache_ttl")]
    pub settings_cache_ttl: Duration,

    /// Provider-setting rotation.
    #[serde(default)]
    pub rotation: RotationConfig,
}

fn default_settings_cache_ttl() -> Duration {
    DEFAULT_SETTINGS_CACHE_TTL
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            encryption: EncryptionConfig::default(),
            settings_cache_ttl: default_settings_cache_ttl(),
            rotation: RotationConfig::default(),
        }
    }
}

impl SecurityConfig {
    /// Create a new security config builder.
    #[must_use]
    pub fn builder() -> SecurityConfigBuilder {
        SecurityConfigBuilder::default()
    }

    /// Build the secret cipher this config describes.
    ///
    /// # Errors
    /// Returns an error if encryption is enabled without a valid 32-byte key.
    pub fn cipher(&self) -> Result<SecretCipher> {
        if !self.encryption.enabled {
            return Ok(SecretCipher::disabled());
        }
        let key = self
            .encryption
            .key
            .as_ref()
            .ok_or_else(|| SecurityError::config("encryption enabled without a key"))?;
        SecretCipher::from_hex(key.expose_secret())
    }

    /// Build the rotation source this config describes.
    #[must_use]
    pub fn rotation_source(&self) -> Arc<dyn RotationSource> {
        match self.rotation.seed {
            Some(seed) => Arc::new(SeededRotation::new(seed)),
            None => Arc::new(RandomRotation),
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns an error describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.settings_cache_ttl.is_zero() {
            return Err(SecurityError::config("settings_cache_ttl must be positive"));
        }
        self.cipher().map(|_| ())
    }
}

/// Builder for security configuration.
#[derive(Debug, Default)]
pub struct SecurityConfigBuilder {
    config: SecurityConfig,
}

impl SecurityConfigBuilder {
    /// Enable encryption with a hex-encoded key.
    #[must_use]
    pub fn encryption_key(mut self, hex_key: impl Into<String>) -> Self {
        self.config.encryption = EncryptionConfig {
            enabled: true,
            key: Some(SecretString::new(hex_key.into())),
        };
        self
    }

    /// Set settings cache lifetime.
    #[must_use]
    pub fn settings_cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.settings_cache_ttl = ttl;
        self
    }

    /// Seed rotation for reproducible picks.
    #[must_use]
    pub fn rotation_seed(mut self, seed: u64) -> Self {
        self.config.rotation.seed = Some(seed);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> SecurityConfig {
        self.config
    }
}

/// Provider secret encryption configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Whether secrets are encrypted at rest.
    #[serde(default)]
    pub enabled: bool,

    /// Hex-encoded 32-byte key.
    #[serde(default, skip_serializing)]
    pub key: Option<SecretString>,
}

/// Rotation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Seed for a reproducible rotation sequence; random when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}
