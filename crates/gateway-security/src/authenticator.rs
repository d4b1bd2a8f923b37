//! Request authentication and provider-setting selection.
//!
//! Authentication resolves the caller's gateway key, decides which provider
//! settings the request may use, picks one, decrypts its secret and rewrites
//! the outbound credential header. Route requests keep their headers; the
//! route executor attaches credentials per step.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use gateway_core::route::{is_route_path, route_lookup_path};
use gateway_core::store::updated_at_context;
use gateway_core::{
    anonymize, Decryptor, GatewayError, GatewayResult, InboundRequest, Key, KeyCache,
    ProviderSetting, RouteStore, SettingResolver,
};
use tracing::{debug, warn};

use crate::credentials::extract_api_key;
use crate::crypto::HashingService;
use crate::custom_auth::AuthTemplate;
use crate::rewrite::rewrite_auth_header;
use crate::rotation::{RandomRotation, RotationSource};

/// Outcome of a successful authentication.
#[derive(Debug, Clone, PartialEq)]
pub struct Authorization {
    /// The caller's key
    pub key: Key,
    /// Every provider setting eligible for the request
    pub settings: Vec<ProviderSetting>,
    /// Index of the setting chosen for dispatch
    pub selected: usize,
}

impl Authorization {
    /// The setting chosen for dispatch, with its secret decrypted when possible.
    #[must_use]
    pub fn selected_setting(&self) -> Option<&ProviderSetting> {
        self.settings.get(self.selected)
    }
}

/// Authenticates inbound requests against gateway keys.
#[derive(Clone)]
pub struct Authenticator {
    keys: Arc<dyn KeyCache>,
    settings: Arc<dyn SettingResolver>,
    routes: Arc<dyn RouteStore>,
    decryptor: Arc<dyn Decryptor>,
    rotation: Arc<dyn RotationSource>,
    /// Compiled custom-auth templates by setting id, tagged with the
    /// setting's `updated_at` they were compiled from
    templates: Arc<DashMap<String, (i64, Arc<AuthTemplate>)>>,
}

impl Authenticator {
    /// Create an authenticator that rotates with the thread-local RNG.
    pub fn new(
        keys: Arc<dyn KeyCache>,
        settings: Arc<dyn SettingResolver>,
        routes: Arc<dyn RouteStore>,
        decryptor: Arc<dyn Decryptor>,
    ) -> Self {
        Self {
            keys,
            settings,
            routes,
            decryptor,
            rotation: Arc::new(RandomRotation),
            templates: Arc::new(DashMap::new()),
        }
    }

    /// Replace the rotation source
    #[must_use]
    pub fn with_rotation(mut self, rotation: Arc<dyn RotationSource>) -> Self {
        self.rotation = rotation;
        self
    }

    /// Authenticate `req`, rewriting its credential header for dispatch.
    ///
    /// `custom_provider_id` names the setting that describes a custom
    /// provider's auth template; it is only consulted for requests in the
    /// custom-provider namespace.
    ///
    /// # Errors
    /// - `Auth` when no credential is present, the key is unknown or revoked,
    ///   the key may not use the route, or no setting is eligible
    /// - `NotFound` when the route or custom-provider setting does not exist
    /// - `Validation` when the selected setting has no usable key
    /// - `Collaborator` when the key or custom-provider lookup fails
    pub async fn authenticate(
        &self,
        req: &mut InboundRequest,
        custom_provider_id: Option<&str>,
    ) -> GatewayResult<Authorization> {
        if req.is_custom_provider_request() {
            return self
                .authenticate_custom(req, custom_provider_id.unwrap_or_default())
                .await;
        }

        let raw = extract_api_key(req)?;
        let key = self.resolve_key(&raw).await?;
        let anonymized = anonymize(&raw);

        let route_path = is_route_path(req.path());
        let route = if route_path {
            let route = self
                .routes
                .get_route(route_lookup_path(req.path()))
                .ok_or_else(|| GatewayError::not_found("route not found"))?;
            if !route.allows(&key.key_id) {
                return Err(GatewayError::auth("not authorized"));
            }
            Some(route)
        } else {
            None
        };

        let linked = self.linked_settings(&key).await;
        let mut selected: Vec<ProviderSetting> = linked
            .iter()
            .filter(|s| s.kind().can_access_path(req.path()))
            .cloned()
            .collect();

        if let Some(route) = &route {
            // A route needs one setting per provider it uses; the last linked
            // setting of each provider wins.
            let mut by_provider: BTreeMap<&str, &ProviderSetting> = BTreeMap::new();
            for setting in &linked {
                by_provider.insert(setting.provider.as_str(), setting);
            }
            let required = route.required_providers();
            selected = required
                .iter()
                .map(|p| by_provider.get(p).map(|s| (*s).clone()))
                .collect::<Option<Vec<_>>>()
                .unwrap_or_default();

            if selected.is_empty() {
                return Err(GatewayError::auth(format!(
                    "provider settings associated with the key {anonymized} are not compatible with the route"
                )));
            }
        }

        if selected.is_empty() {
            return Err(GatewayError::auth(format!(
                "provider setting not found for key {anonymized}"
            )));
        }

        let index = if key.rotation_enabled {
            self.rotation.pick(selected.len())
        } else {
            0
        };
        self.decrypt_secret(&mut selected[index]).await;

        if !route_path {
            rewrite_auth_header(req, &selected[index])?;
        }

        debug!(
            key_id = %key.key_id,
            setting_id = %selected[index].id,
            provider = %selected[index].provider,
            eligible = selected.len(),
            "Request authenticated"
        );

        Ok(Authorization {
            key,
            settings: selected,
            selected: index,
        })
    }

    async fn authenticate_custom(
        &self,
        req: &mut InboundRequest,
        setting_id: &str,
    ) -> GatewayResult<Authorization> {
        let setting = self
            .settings
            .resolve_setting(setting_id)
            .await?
            .ok_or_else(|| {
                GatewayError::not_found(format!("provider setting {setting_id} is not found"))
            })?;

        let template = self.template_for(&setting)?;
        let raw = template.extract(req, &setting.id)?;
        let key = self.resolve_key(&raw).await?;

        template.inject(req, setting.api_key())?;

        debug!(
            key_id = %key.key_id,
            setting_id = %setting.id,
            provider = %setting.provider,
            "Custom provider request authenticated"
        );

        Ok(Authorization {
            key,
            settings: vec![setting],
            selected: 0,
        })
    }

    /// Compiled template for a custom-provider setting.
    ///
    /// A template is recompiled only when the setting's `updated_at` moves.
    fn template_for(&self, setting: &ProviderSetting) -> GatewayResult<Arc<AuthTemplate>> {
        if let Some(entry) = self.templates.get(&setting.id) {
            let (updated_at, template) = entry.value();
            if *updated_at == setting.updated_at {
                return Ok(template.clone());
            }
        }

        let template = Arc::new(AuthTemplate::from_setting(setting)?);
        self.templates
            .insert(setting.id.clone(), (setting.updated_at, template.clone()));
        debug!(setting_id = %setting.id, "Compiled custom auth template");
        Ok(template)
    }

    /// Look a raw secret up by hash, then as-is.
    async fn resolve_key(&self, raw: &str) -> GatewayResult<Key> {
        let anonymized = anonymize(raw);

        let by_hash = match self.keys.get_key(&HashingService::hash_key(raw)).await {
            Ok(found) => found,
            Err(err) => {
                warn!(key = %anonymized, error = %err, "Key lookup by hash failed");
                None
            }
        };
        let key = match by_hash {
            Some(key) => Some(key),
            None => self.keys.get_key(raw).await?,
        };

        let key = key.ok_or_else(|| GatewayError::auth(format!("key {anonymized} is not found")))?;
        if key.revoked {
            return Err(GatewayError::auth(format!("key {anonymized} has been revoked")));
        }
        Ok(key)
    }

    async fn linked_settings(&self, key: &Key) -> Vec<ProviderSetting> {
        let ids = key.linked_setting_ids();
        let mut settings = Vec::with_capacity(ids.len());
        let mut skipped = 0usize;

        for id in ids {
            match self.settings.resolve_setting(id).await {
                Ok(Some(setting)) => settings.push(setting),
                Ok(None) => skipped += 1,
                Err(err) => {
                    warn!(key_id = %key.key_id, setting_id = %id, error = %err, "Provider setting lookup failed");
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            debug!(key_id = %key.key_id, skipped, "Skipped unresolvable provider settings");
        }
        settings
    }

    /// Decrypt the setting's secret in place; failures keep the stored value.
    async fn decrypt_secret(&self, setting: &mut ProviderSetting) {
        if !self.decryptor.enabled() {
            return;
        }

        let param = setting.kind().secret_param();
        let ciphertext = setting.param(param);
        if ciphertext.is_empty() {
            return;
        }

        let context = updated_at_context(setting.updated_at);
        let decrypted = self.decryptor.decrypt(ciphertext, &context).await;
        match decrypted {
            Ok(plaintext) => {
                setting.setting.insert(param.to_string(), plaintext);
            }
            Err(err) => {
                warn!(setting_id = %setting.id, error = %err, "Failed to decrypt provider secret, using stored value");
            }
        }
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("decryption_enabled", &self.decryptor.enabled())
            .field("rotation", &self.rotation)
            .field("cached_templates", &self.templates.len())
            .finish_non_exhaustive()
    }
}
