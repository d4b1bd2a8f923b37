//! Collaborator capabilities the pipeline depends on.
//!
//! Lookups return `Ok(None)` for a clean miss and `Err` only for collaborator
//! failures. None of these are retried by the pipeline.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::StoreResult;
use crate::key::{Key, TimeUnit};
use crate::provider::{CustomProvider, ProviderSetting, SettingUpdate};
use crate::route::Route;

/// Context header carrying the setting's last-updated timestamp.
pub const UPDATED_AT_HEADER: &str = "X-UPDATED-AT";

/// Context passed to encrypt/decrypt calls.
pub type CipherContext = BTreeMap<String, String>;

/// Build the cipher context for a setting updated at `updated_at`.
#[must_use]
pub fn updated_at_context(updated_at: i64) -> CipherContext {
    let mut context = CipherContext::new();
    context.insert(UPDATED_AT_HEADER.to_string(), updated_at.to_string());
    context
}

/// Key lookup by secret hash or, as a fallback, by raw secret.
#[async_trait]
pub trait KeyCache: Send + Sync {
    /// Look up a key.
    async fn get_key(&self, lookup: &str) -> StoreResult<Option<Key>>;
}

/// Provider-setting resolution used on the request path.
#[async_trait]
pub trait SettingResolver: Send + Sync {
    /// Resolve a single setting, including secret fields.
    async fn resolve_setting(&self, id: &str) -> StoreResult<Option<ProviderSetting>>;

    /// Resolve several settings; missing ones are skipped.
    async fn resolve_settings(&self, ids: &[&str]) -> StoreResult<Vec<ProviderSetting>> {
        let mut settings = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(setting) = self.resolve_setting(id).await? {
                settings.push(setting);
            }
        }
        Ok(settings)
    }
}

/// Persistent provider-setting storage.
#[async_trait]
pub trait ProviderSettingStore: Send + Sync {
    /// Read a setting.
    async fn get_setting(&self, id: &str) -> StoreResult<Option<ProviderSetting>>;

    /// Persist a new setting.
    async fn create_setting(&self, setting: ProviderSetting) -> StoreResult<ProviderSetting>;

    /// Apply an update to an existing setting.
    async fn update_setting(&self, id: &str, update: SettingUpdate)
        -> StoreResult<ProviderSetting>;

    /// Look up a registered custom provider.
    async fn get_custom_provider(&self, name: &str) -> StoreResult<Option<CustomProvider>>;
}

/// Short-lived provider-setting cache.
#[async_trait]
pub trait SettingsCache: Send + Sync {
    /// Read a cached setting.
    async fn get(&self, id: &str) -> StoreResult<Option<ProviderSetting>>;

    /// Cache a setting for `ttl`.
    async fn set(&self, id: &str, setting: &ProviderSetting, ttl: Duration) -> StoreResult<()>;

    /// Drop a cached setting.
    async fn delete(&self, id: &str) -> StoreResult<()>;
}

/// Memory-resident route table.
pub trait RouteStore: Send + Sync {
    /// Look up a route by its path relative to the route namespace.
    fn get_route(&self, path: &str) -> Option<Route>;
}

/// Counter scoped to a key and a time window.
#[async_trait]
pub trait WindowedCounter: Send + Sync {
    /// Current value for the window containing now.
    async fn get_counter(&self, key_id: &str, unit: TimeUnit) -> StoreResult<i64>;
}

/// Lifetime counter scoped to a key.
#[async_trait]
pub trait Counter: Send + Sync {
    /// Current value.
    async fn get_counter(&self, key_id: &str) -> StoreResult<i64>;
}

/// Secret decryption capability.
#[async_trait]
pub trait Decryptor: Send + Sync {
    /// Whether decryption is configured.
    fn enabled(&self) -> bool;

    /// Decrypt `ciphertext` bound to `context`.
    async fn decrypt(&self, ciphertext: &str, context: &CipherContext) -> StoreResult<String>;
}

/// Secret encryption capability.
#[async_trait]
pub trait Encryptor: Send + Sync {
    /// Whether encryption is configured.
    fn enabled(&self) -> bool;

    /// Encrypt `plaintext` bound to `context`.
    async fn encrypt(&self, plaintext: &str, context: &CipherContext) -> StoreResult<String>;
}
