//! Test harness wiring the pipeline to in-memory collaborators

use std::sync::Arc;

use gateway_core::{
    GatewayError, Key, MemoryCounter, MemoryKeyStore, MemoryRouteStore, MemorySettingStore,
    MemorySettingsCache, ProviderSetting, Route, SettingResolver,
};
use gateway_limits::{FixedClock, LimitValidator};
use gateway_security::{
    Authenticator, ProviderSettingManager, RotationSource, SecretCipher, SequenceRotation,
};
use llm_metering_gateway::MeteringPipeline;

use crate::fixtures::NOW;

/// In-memory gateway state shared by a test
pub struct TestGateway {
    /// Key store
    pub keys: Arc<MemoryKeyStore>,
    /// Provider setting store
    pub settings: Arc<MemorySettingStore>,
    /// Provider setting cache
    pub settings_cache: Arc<MemorySettingsCache>,
    /// Route store
    pub routes: Arc<MemoryRouteStore>,
    /// Lifetime request counter
    pub requests: Arc<MemoryCounter>,
    /// Windowed request counter
    pub rate: Arc<MemoryCounter>,
    /// Windowed cost counter, micro-dollars
    pub cost_window: Arc<MemoryCounter>,
    /// Lifetime cost counter, micro-dollars
    pub cost_total: Arc<MemoryCounter>,
    /// Clock used for TTL checks
    pub clock: Arc<FixedClock>,
    /// Secret cipher
    pub cipher: SecretCipher,
    rotation: Arc<dyn RotationSource>,
}

impl TestGateway {
    /// Gateway without encryption
    pub fn new() -> Self {
        Self::with_cipher(SecretCipher::disabled())
    }

    /// Gateway encrypting provider secrets with a fresh key
    pub fn encrypted() -> Self {
        let cipher = SecretCipher::new(&SecretCipher::generate_key()).expect("valid key");
        Self::with_cipher(cipher)
    }

    fn with_cipher(cipher: SecretCipher) -> Self {
        Self {
            keys: Arc::new(MemoryKeyStore::new()),
            settings: Arc::new(MemorySettingStore::new()),
            settings_cache: Arc::new(MemorySettingsCache::new()),
            routes: Arc::new(MemoryRouteStore::new()),
            requests: Arc::new(MemoryCounter::new()),
            rate: Arc::new(MemoryCounter::new()),
            cost_window: Arc::new(MemoryCounter::new()),
            cost_total: Arc::new(MemoryCounter::new()),
            clock: Arc::new(FixedClock::new(NOW)),
            cipher,
            rotation: Arc::new(SequenceRotation::new(vec![0])),
        }
    }

    /// Pick settings in this order when rotating
    #[must_use]
    pub fn with_rotation_picks(mut self, picks: Vec<usize>) -> Self {
        self.rotation = Arc::new(SequenceRotation::new(picks));
        self
    }

    /// Rotate with `rotation`
    #[must_use]
    pub fn with_rotation(mut self, rotation: Arc<dyn RotationSource>) -> Self {
        self.rotation = rotation;
        self
    }

    /// Store a key by its hash
    pub fn add_key(&self, key: Key) -> &Self {
        self.keys.insert_hashed(key);
        self
    }

    /// Store a provider setting as-is
    pub fn add_setting(&self, setting: ProviderSetting) -> &Self {
        self.settings.insert(setting);
        self
    }

    /// Store a route
    pub fn add_route(&self, route: Route) -> &Self {
        self.routes.insert(route);
        self
    }

    /// Setting manager over the store, cache and cipher
    pub fn manager(&self) -> ProviderSettingManager {
        let cipher = Arc::new(self.cipher.clone());
        ProviderSettingManager::new(
            self.settings.clone(),
            self.settings_cache.clone(),
            cipher.clone(),
            cipher,
        )
    }

    /// Authenticator resolving settings through `resolver`
    pub fn authenticator_with(&self, resolver: Arc<dyn SettingResolver>) -> Authenticator {
        Authenticator::new(
            self.keys.clone(),
            resolver,
            self.routes.clone(),
            Arc::new(self.cipher.clone()),
        )
        .with_rotation(self.rotation.clone())
    }

    /// Authenticator reading the setting store directly
    pub fn authenticator(&self) -> Authenticator {
        self.authenticator_with(self.settings.clone())
    }

    /// Validator over the test counters and clock
    pub fn validator(&self) -> LimitValidator {
        LimitValidator::new(
            self.cost_window.clone(),
            self.rate.clone(),
            self.cost_total.clone(),
            self.requests.clone(),
        )
        .with_clock(self.clock.clone())
    }

    /// Full admission pipeline
    pub fn pipeline(&self) -> MeteringPipeline {
        MeteringPipeline::new(self.authenticator(), self.validator())
    }
}

impl Default for TestGateway {
    fn default() -> Self {
        Self::new()
    }
}

/// Assert the HTTP status an error maps to
pub fn assert_status(err: &GatewayError, status: u16) {
    assert_eq!(err.status_code(), status, "unexpected status for {err}");
}
