//! # Gateway Security
//!
//! Request authentication and provider-secret handling for the metering gateway.
//!
//! ## Features
//!
//! - **Credential Extraction**: Gateway keys from `x-api-key`, `api-key` or `Authorization`
//! - **Custom Auth Templates**: Header/query templates for custom providers
//! - **Key Resolution**: Hash lookup with raw fallback, anonymized diagnostics
//! - **Setting Selection**: Path compatibility, route requirements and rotation
//! - **Secret Encryption**: AES-256-GCM bound to the setting's update timestamp
//! - **Setting Management**: Validation, encryption at rest and read-through caching
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gateway_core::{InboundRequest, MemoryKeyStore, MemoryRouteStore, MemorySettingStore};
//! use gateway_security::{Authenticator, SecretCipher};
//!
//! # async fn run() -> gateway_core::GatewayResult<()> {
//! let authenticator = Authenticator::new(
//!     Arc::new(MemoryKeyStore::new()),
//!     Arc::new(MemorySettingStore::new()),
//!     Arc::new(MemoryRouteStore::new()),
//!     Arc::new(SecretCipher::disabled()),
//! );
//! let mut req = InboundRequest::new("/api/providers/openai/v1/chat/completions")
//!     .with_header("authorization", "Bearer gw-key")?;
//! let _auth = authenticator.authenticate(&mut req, None).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authenticator;
pub mod config;
pub mod credentials;
pub mod crypto;
pub mod custom_auth;
pub mod error;
pub mod rewrite;
pub mod rotation;
pub mod settings;

pub use authenticator::{Authenticator, Authorization};
pub use config::{SecurityConfig, SecurityConfigBuilder};
pub use credentials::extract_api_key;
pub use crypto::{HashingService, SecretCipher};
pub use custom_auth::{AuthLocation, AuthTemplate};
pub use error::{Result, SecurityError};
pub use rewrite::rewrite_auth_header;
pub use rotation::{RandomRotation, RotationSource, SeededRotation, SequenceRotation};
pub use settings::ProviderSettingManager;
