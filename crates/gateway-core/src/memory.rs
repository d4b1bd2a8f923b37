//! In-memory collaborator implementations.
//!
//! Suitable for single-instance deployments and tests. Network-backed stores
//! implement the same traits from [`crate::store`].

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::key::{Key, TimeUnit};
use crate::provider::{CustomProvider, ProviderSetting, SettingUpdate};
use crate::route::Route;
use crate::store::{
    Counter, KeyCache, ProviderSettingStore, RouteStore, SettingResolver, SettingsCache,
    WindowedCounter,
};

/// Keys indexed by lookup string (hash or raw secret).
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: DashMap<String, Key>,
}

impl MemoryKeyStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a key by its hash.
    pub fn insert_hashed(&self, key: Key) {
        self.keys.insert(key.hashed_key.clone(), key);
    }

    /// Index a key under an arbitrary lookup string.
    pub fn insert(&self, lookup: impl Into<String>, key: Key) {
        self.keys.insert(lookup.into(), key);
    }

    /// Number of indexed entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl KeyCache for MemoryKeyStore {
    async fn get_key(&self, lookup: &str) -> StoreResult<Option<Key>> {
        Ok(self.keys.get(lookup).map(|entry| entry.value().clone()))
    }
}

/// Provider settings and custom providers.
#[derive(Debug, Default)]
pub struct MemorySettingStore {
    settings: DashMap<String, ProviderSetting>,
    custom_providers: DashMap<String, CustomProvider>,
}

impl MemorySettingStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a setting.
    pub fn insert(&self, setting: ProviderSetting) {
        self.settings.insert(setting.id.clone(), setting);
    }

    /// Register a custom provider.
    pub fn register_custom_provider(&self, provider: CustomProvider) {
        self.custom_providers
            .insert(provider.provider.clone(), provider);
    }
}

#[async_trait]
impl ProviderSettingStore for MemorySettingStore {
    async fn get_setting(&self, id: &str) -> StoreResult<Option<ProviderSetting>> {
        Ok(self.settings.get(id).map(|entry| entry.value().clone()))
    }

    async fn create_setting(&self, setting: ProviderSetting) -> StoreResult<ProviderSetting> {
        if self.settings.contains_key(&setting.id) {
            return Err(StoreError::Conflict(format!(
                "provider setting {} already exists",
                setting.id
            )));
        }
        self.settings.insert(setting.id.clone(), setting.clone());
        Ok(setting)
    }

    async fn update_setting(
        &self,
        id: &str,
        update: SettingUpdate,
    ) -> StoreResult<ProviderSetting> {
        let mut entry = self
            .settings
            .get_mut(id)
            .ok_or_else(|| StoreError::Conflict(format!("provider setting {id} does not exist")))?;

        let setting = entry.value_mut();
        if let Some(name) = update.name {
            setting.name = name;
        }
        if !update.setting.is_empty() {
            setting.setting = update.setting;
        }
        if let Some(models) = update.allowed_models {
            setting.allowed_models = models;
        }
        setting.updated_at = update.updated_at;
        Ok(setting.clone())
    }

    async fn get_custom_provider(&self, name: &str) -> StoreResult<Option<CustomProvider>> {
        Ok(self
            .custom_providers
            .get(name)
            .map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl SettingResolver for MemorySettingStore {
    async fn resolve_setting(&self, id: &str) -> StoreResult<Option<ProviderSetting>> {
        self.get_setting(id).await
    }
}

/// Setting cache with per-entry expiry.
#[derive(Debug, Default)]
pub struct MemorySettingsCache {
    entries: DashMap<String, (ProviderSetting, Instant)>,
}

impl MemorySettingsCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsCache for MemorySettingsCache {
    async fn get(&self, id: &str) -> StoreResult<Option<ProviderSetting>> {
        let expired = match self.entries.get(id) {
            Some(entry) if entry.1 > Instant::now() => return Ok(Some(entry.0.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!(setting_id = %id, "Evicting expired provider setting");
            self.entries.remove(id);
        }
        Ok(None)
    }

    async fn set(&self, id: &str, setting: &ProviderSetting, ttl: Duration) -> StoreResult<()> {
        self.entries
            .insert(id.to_string(), (setting.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.entries.remove(id);
        Ok(())
    }
}

/// Routes indexed by path.
#[derive(Debug, Default)]
pub struct MemoryRouteStore {
    routes: DashMap<String, Route>,
}

impl MemoryRouteStore {
    /// Create an empty route table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a route.
    pub fn insert(&self, route: Route) {
        self.routes.insert(route.path.clone(), route);
    }
}

impl RouteStore for MemoryRouteStore {
    fn get_route(&self, path: &str) -> Option<Route> {
        self.routes.get(path).map(|entry| entry.value().clone())
    }
}

/// Usage counters, lifetime and windowed.
///
/// Window rollover is the writer's concern; reads return whatever was last set.
#[derive(Debug, Default)]
pub struct MemoryCounter {
    values: DashMap<(String, Option<TimeUnit>), i64>,
}

impl MemoryCounter {
    /// Create an empty counter set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a lifetime counter.
    pub fn set(&self, key_id: &str, value: i64) {
        self.values.insert((key_id.to_string(), None), value);
    }

    /// Set a windowed counter.
    pub fn set_windowed(&self, key_id: &str, unit: TimeUnit, value: i64) {
        self.values.insert((key_id.to_string(), Some(unit)), value);
    }

    /// Add to a lifetime counter, returning the new value.
    pub fn add(&self, key_id: &str, delta: i64) -> i64 {
        let mut entry = self.values.entry((key_id.to_string(), None)).or_insert(0);
        *entry += delta;
        *entry
    }

    /// Add to a windowed counter, returning the new value.
    pub fn add_windowed(&self, key_id: &str, unit: TimeUnit, delta: i64) -> i64 {
        let mut entry = self
            .values
            .entry((key_id.to_string(), Some(unit)))
            .or_insert(0);
        *entry += delta;
        *entry
    }

    fn read(&self, key_id: &str, unit: Option<TimeUnit>) -> i64 {
        self.values
            .get(&(key_id.to_string(), unit))
            .map_or(0, |entry| *entry.value())
    }
}

#[async_trait]
impl Counter for MemoryCounter {
    async fn get_counter(&self, key_id: &str) -> StoreResult<i64> {
        Ok(self.read(key_id, None))
    }
}

#[async_trait]
impl WindowedCounter for MemoryCounter {
    async fn get_counter(&self, key_id: &str, unit: TimeUnit) -> StoreResult<i64> {
        Ok(self.read(key_id, Some(unit)))
    }
}
