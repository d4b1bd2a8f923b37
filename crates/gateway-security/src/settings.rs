//! Provider-setting management: validation, encryption at rest and
//! read-through caching.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use gateway_core::provider::params;
use gateway_core::store::updated_at_context;
use gateway_core::{
    Decryptor, Encryptor, GatewayError, GatewayResult, ProviderKind, ProviderSetting, ProviderSettingStore,
    SettingResolver, SettingUpdate, SettingsCache, StoreResult,
};
use tracing::{debug, info, warn};

use crate::custom_auth::AuthTemplate;

/// Default lifetime of cached settings.
pub const DEFAULT_SETTINGS_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Creates, updates and resolves provider settings.
#[derive(Clone)]
pub struct ProviderSettingManager {
    storage: Arc<dyn ProviderSettingStore>,
    cache: Arc<dyn SettingsCache>,
    encryptor: Arc<dyn Encryptor>,
    decryptor: Arc<dyn Decryptor>,
    cache_ttl: Duration,
}

impl ProviderSettingManager {
    /// Create a manager with the default cache lifetime.
    ///
    /// `decryptor` must undo `encryptor`; it is used to carry a stored secret
    /// over to the new update timestamp when an update does not replace it.
    pub fn new(
        storage: Arc<dyn ProviderSettingStore>,
        cache: Arc<dyn SettingsCache>,
        encryptor: Arc<dyn Encryptor>,
        decryptor: Arc<dyn Decryptor>,
    ) -> Self {
        Self {
            storage,
            cache,
            encryptor,
            decryptor,
            cache_ttl: DEFAULT_SETTINGS_CACHE_TTL,
        }
    }

    /// Set cache lifetime
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Check that `params` is complete for `provider`.
    ///
    /// Native providers need every required field non-empty. Custom
    /// providers must be registered and carry their declared auth field.
    ///
    /// # Errors
    /// Returns a validation error describing the first problem found.
    pub async fn validate_params(
        &self,
        provider: &str,
        params: &BTreeMap<String, String>,
    ) -> GatewayResult<()> {
        let kind = ProviderKind::from_name(provider);
        let present = |field: &str| params.get(field).is_some_and(|v| !v.is_empty());

        if !kind.is_native() {
            let custom = self
                .storage
                .get_custom_provider(provider)
                .await?
                .ok_or_else(|| {
                    GatewayError::validation(format!("provider {provider} is not supported"))
                })?;
            if !custom.authentication_param.is_empty() && !present(&custom.authentication_param)
            {
                return Err(GatewayError::validation(format!(
                    "provider {provider} is missing value for field {}",
                    custom.authentication_param
                )));
            }
            return Ok(());
        }

        let missing: Vec<&str> = kind
            .required_params()
            .iter()
            .copied()
            .filter(|field| !present(field))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::validation(format!(
                "provider {provider} is missing fields {}",
                missing.join(",")
            )))
        }
    }

    /// Validate, stamp, encrypt and persist a new setting.
    ///
    /// An empty id is replaced with a fresh UUID.
    ///
    /// # Errors
    /// Returns a validation error for incomplete params and a collaborator
    /// error when encryption or storage fails.
    pub async fn create_setting(&self, mut setting: ProviderSetting) -> GatewayResult<ProviderSetting> {
        if setting.provider.is_empty() {
            return Err(GatewayError::validation("provider field cannot be empty"));
        }
        self.validate_params(&setting.provider, &setting.setting).await?;

        if setting.id.is_empty() {
            setting.id = uuid::Uuid::new_v4().to_string();
        }
        let template = setting.param(params::AUTH_TEMPLATE);
        if !template.is_empty() {
            AuthTemplate::parse(setting.param(params::AUTH_LOCATION), template)?
                .apply_to(&mut setting);
        }

        let now = Utc::now().timestamp();
        setting.created_at = now;
        setting.updated_at = now;
        let kind = setting.kind();
        let params = std::mem::take(&mut setting.setting);
        setting.setting = self.encrypt_params(&kind, now, params).await?;

        let created = self.storage.create_setting(setting).await?;
        info!(setting_id = %created.id, provider = %created.provider, "Provider setting created");
        Ok(created)
    }

    /// Merge `params` into an existing setting and persist it.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown id, a validation error when the
    /// merged params are incomplete, and a collaborator error otherwise.
    pub async fn update_setting(
        &self,
        id: &str,
        name: Option<String>,
        params: BTreeMap<String, String>,
        allowed_models: Option<Vec<String>>,
    ) -> GatewayResult<ProviderSetting> {
        if id.is_empty() {
            return Err(GatewayError::validation("id cannot be empty"));
        }
        let existing = self
            .storage
            .get_setting(id)
            .await?
            .ok_or_else(|| GatewayError::not_found("provider setting is not found"))?;

        let kind = existing.kind();
        let mut merged = existing.setting.clone();
        if !params.contains_key(kind.secret_param()) {
            if let Some(plain) = self.decrypt_stored_secret(&existing).await {
                merged.insert(kind.secret_param().to_string(), plain);
            }
        }
        merged.extend(params);
        self.validate_params(&existing.provider, &merged).await?;

        if let Err(err) = self.cache.delete(id).await {
            warn!(setting_id = %id, error = %err, "Failed to invalidate cached provider setting");
        }

        let now = Utc::now().timestamp();
        let update = SettingUpdate {
            name,
            setting: self.encrypt_params(&kind, now, merged).await?,
            updated_at: now,
            allowed_models,
        };
        let updated = self.storage.update_setting(id, update).await?;
        info!(setting_id = %id, "Provider setting updated");
        Ok(updated)
    }

    /// Read a setting through the cache, populating it on a miss.
    ///
    /// # Errors
    /// Returns the storage error; cache failures are logged and ignored.
    pub async fn get_setting_via_cache(&self, id: &str) -> StoreResult<Option<ProviderSetting>> {
        match self.cache.get(id).await {
            Ok(Some(setting)) => return Ok(Some(setting)),
            Ok(None) => {}
            Err(err) => warn!(setting_id = %id, error = %err, "Provider setting cache read failed"),
        }

        let Some(setting) = self.storage.get_setting(id).await? else {
            return Ok(None);
        };
        if let Err(err) = self.cache.set(id, &setting, self.cache_ttl).await {
            warn!(setting_id = %id, error = %err, "Failed to cache provider setting");
        }
        debug!(setting_id = %id, "Provider setting loaded from storage");
        Ok(Some(setting))
    }

    /// Read several settings through the cache; unknown ids are skipped.
    ///
    /// # Errors
    /// Returns the first storage error.
    pub async fn get_settings_via_cache(&self, ids: &[&str]) -> StoreResult<Vec<ProviderSetting>> {
        let mut settings = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(setting) = self.get_setting_via_cache(id).await? {
                settings.push(setting);
            }
        }
        Ok(settings)
    }

    /// Plaintext of the stored secret, when it is encrypted at rest.
    ///
    /// A secret that does not decrypt is left as stored, matching how the
    /// request path treats it.
    async fn decrypt_stored_secret(&self, existing: &ProviderSetting) -> Option<String> {
        let kind = existing.kind();
        if !self.encryptor.enabled() || !self.decryptor.enabled() || !kind.encrypts_secret() {
            return None;
        }
        let ciphertext = existing.param(kind.secret_param());
        if ciphertext.is_empty() {
            return None;
        }

        match self
            .decryptor
            .decrypt(ciphertext, &updated_at_context(existing.updated_at))
            .await
        {
            Ok(plain) => Some(plain),
            Err(err) => {
                warn!(setting_id = %existing.id, error = %err, "Stored provider secret did not decrypt, keeping stored value");
                None
            }
        }
    }

    async fn encrypt_params(
        &self,
        kind: &ProviderKind,
        updated_at: i64,
        mut params: BTreeMap<String, String>,
    ) -> GatewayResult<BTreeMap<String, String>> {
        if !self.encryptor.enabled() || !kind.encrypts_secret() {
            return Ok(params);
        }
        let field = kind.secret_param();
        let Some(plain) = params.get(field).filter(|v| !v.is_empty()) else {
            return Ok(params);
        };

        let encrypted = self
            .encryptor
            .encrypt(plain, &updated_at_context(updated_at))
            .await?;
        params.insert(field.to_string(), encrypted);
        Ok(params)
    }
}

impl std::fmt::Debug for ProviderSettingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettingManager")
            .field("cache_ttl", &self.cache_ttl)
            .field("encryption_enabled", &self.encryptor.enabled())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SettingResolver for ProviderSettingManager {
    async fn resolve_setting(&self, id: &str) -> StoreResult<Option<ProviderSetting>> {
        self.get_setting_via_cache(id).await
    }

    async fn resolve_settings(&self, ids: &[&str]) -> StoreResult<Vec<ProviderSetting>> {
        self.get_settings_via_cache(ids).await
    }
}
