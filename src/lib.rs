//! # LLM Metering Gateway
//!
//! Request authorization and usage metering for an LLM gateway.
//!
//! The [`MeteringPipeline`] runs the per-request admission path: resolve the
//! caller's key and provider settings, then check the key's limits. Both steps
//! are bound to the inbound request's cancellation token and a time budget.
//! Cost estimation runs after the upstream call through [`CostEstimators`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gateway_core::{InboundRequest, MemoryCounter, MemoryKeyStore, MemoryRouteStore, MemorySettingStore};
//! use gateway_limits::LimitValidator;
//! use gateway_security::{Authenticator, SecretCipher};
//! use llm_metering_gateway::MeteringPipeline;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> gateway_core::GatewayResult<()> {
//! let counters = Arc::new(MemoryCounter::new());
//! let pipeline = MeteringPipeline::new(
//!     Authenticator::new(
//!         Arc::new(MemoryKeyStore::new()),
//!         Arc::new(MemorySettingStore::new()),
//!         Arc::new(MemoryRouteStore::new()),
//!         Arc::new(SecretCipher::disabled()),
//!     ),
//!     LimitValidator::new(counters.clone(), counters.clone(), counters.clone(), counters),
//! );
//!
//! let mut req = InboundRequest::new("/api/providers/openai/v1/chat/completions")
//!     .with_header("x-api-key", "gw-key")?;
//! let _auth = pipeline
//!     .authorize_and_validate(&mut req, None, 0.0, &CancellationToken::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use gateway_config::{PipelineConfig, PricingConfig, DEFAULT_REQUEST_TIMEOUT};
use gateway_core::{GatewayError, GatewayResult, InboundRequest};
use gateway_limits::LimitValidator;
use gateway_security::{Authenticator, Authorization};
use gateway_telemetry::{AnthropicCostEstimator, OpenAiCostEstimator, TokenCounter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub use gateway_config as config;
pub use gateway_core as core;
pub use gateway_limits as limits;
pub use gateway_security as security;
pub use gateway_telemetry as telemetry;

/// Authorization followed by limit validation, under a cancellation token.
#[derive(Clone)]
pub struct MeteringPipeline {
    authenticator: Authenticator,
    validator: LimitValidator,
    request_timeout: Duration,
}

impl std::fmt::Debug for MeteringPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeteringPipeline")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl MeteringPipeline {
    /// Create a pipeline with the default time budget.
    #[must_use]
    pub fn new(authenticator: Authenticator, validator: LimitValidator) -> Self {
        Self {
            authenticator,
            validator,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Apply pipeline configuration
    #[must_use]
    pub fn with_config(self, config: &PipelineConfig) -> Self {
        self.with_request_timeout(config.request_timeout)
    }

    /// Set the time budget
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Time budget for one admission.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Authorize `req` and validate the resolved key's limits.
    ///
    /// The credential header of `req` is rewritten for dispatch only when the
    /// key is admitted; on any error `req` is left as the caller sent it.
    /// Work in flight is dropped as soon as `cancel` fires or the time budget
    /// runs out.
    ///
    /// # Errors
    /// - any authorization or limit error, unchanged
    /// - `Cancelled` when `cancel` fires first
    /// - `Timeout` when the time budget runs out first
    pub async fn authorize_and_validate(
        &self,
        req: &mut InboundRequest,
        custom_provider_id: Option<&str>,
        prompt_cost: f64,
        cancel: &CancellationToken,
    ) -> GatewayResult<Authorization> {
        let timeout = self.request_timeout;
        let mut staged = req.clone();
        let admission = async {
            let authorization = self
                .authenticator
                .authenticate(&mut staged, custom_provider_id)
                .await?;
            self.validator
                .validate(Some(&authorization.key), prompt_cost)
                .await?;
            debug!(key_id = %authorization.key.key_id, settings = authorization.settings.len(), "Request admitted");
            Ok(authorization)
        };

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!("Request cancelled during admission");
                Err(GatewayError::Cancelled)
            }
            result = tokio::time::timeout(timeout, admission) => {
                result.unwrap_or_else(|_| {
                    warn!(timeout = ?timeout, "Admission timed out");
                    Err(GatewayError::Timeout(timeout))
                })
            }
        };

        if result.is_ok() {
            *req = staged;
        }
        result
    }
}

/// Cost estimators for every supported provider family.
#[derive(Debug, Clone)]
pub struct CostEstimators {
    /// OpenAI models
    pub openai: Arc<OpenAiCostEstimator>,
    /// Anthropic models, native and through Bedrock
    pub anthropic: Arc<AnthropicCostEstimator>,
}

impl CostEstimators {
    /// Build estimators from the built-in tables plus configured overrides.
    #[must_use]
    pub fn from_config(pricing: &PricingConfig, counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            openai: Arc::new(OpenAiCostEstimator::with_prices(
                pricing.openai_prices(),
                counter.clone(),
            )),
            anthropic: Arc::new(AnthropicCostEstimator::with_prices(
                pricing.anthropic_prices(),
                counter,
            )),
        }
    }
}
