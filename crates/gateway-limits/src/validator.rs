//! Per-key limit validation.

use std::sync::Arc;

use gateway_core::{Counter, ExpirationKind, GatewayError, GatewayResult, Key, TimeUnit, WindowedCounter};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::ttl::ttl_seconds;

/// Convert dollars to the micro-dollar unit used by cost counters.
#[must_use]
pub fn usd_to_micros(usd: f64) -> i64 {
    (usd * 1_000_000.0) as i64
}

/// Checks a resolved key against its configured limits.
///
/// Checks run in a fixed order and the first failure is reported:
/// presence, revocation, TTL, lifetime requests, requests per window, cost
/// per window, lifetime cost. A limit of zero is unlimited.
#[derive(Clone)]
pub struct LimitValidator {
    cost_over_time: Arc<dyn WindowedCounter>,
    rate: Arc<dyn WindowedCounter>,
    total_cost: Arc<dyn Counter>,
    total_requests: Arc<dyn Counter>,
    clock: Arc<dyn Clock>,
}

impl LimitValidator {
    /// Create a validator reading the given counters.
    pub fn new(
        cost_over_time: Arc<dyn WindowedCounter>,
        rate: Arc<dyn WindowedCounter>,
        total_cost: Arc<dyn Counter>,
        total_requests: Arc<dyn Counter>,
    ) -> Self {
        Self {
            cost_over_time,
            rate,
            total_cost,
            total_requests,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate `key` for admission.
    ///
    /// `_prompt_cost` is accepted for callers that already estimated the
    /// request; it does not take part in any check.
    ///
    /// # Errors
    /// - `Validation` for a missing or revoked key
    /// - `Expiration` for TTL, lifetime request or lifetime cost exhaustion
    /// - `RateLimit` / `CostLimit` for exhausted windows
    /// - `Collaborator` when a counter cannot be read
    pub async fn validate(&self, key: Option<&Key>, _prompt_cost: f64) -> GatewayResult<()> {
        let key = key.ok_or_else(|| GatewayError::validation("empty api key"))?;

        if key.revoked {
            return Err(GatewayError::validation("api key revoked"));
        }

        if !self.ttl_valid(key) {
            return Err(GatewayError::expiration(
                "api key expired",
                ExpirationKind::TtlExpiration,
            ));
        }

        self.check_requests_limit(key).await?;
        self.check_rate_limit(key).await?;
        self.check_cost_limit_over_time(key).await?;
        self.check_cost_limit(key).await?;

        debug!(key_id = %key.key_id, "Key within limits");
        Ok(())
    }

    /// Whether `key` has exhausted a limit or expired.
    ///
    /// Counter read failures are not treated as spent.
    pub async fn is_spent(&self, key: &Key) -> bool {
        match self.validate(Some(key), 0.0).await {
            Ok(()) => false,
            Err(
                GatewayError::Expiration { .. }
                | GatewayError::RateLimit(_)
                | GatewayError::CostLimit(_)
                | GatewayError::Validation(_),
            ) => true,
            Err(_) => false,
        }
    }

    fn ttl_valid(&self, key: &Key) -> bool {
        let secs = ttl_seconds(&key.ttl);
        if secs == 0 {
            return true;
        }
        self.clock.now() < key.created_at.saturating_add(secs)
    }

    async fn check_requests_limit(&self, key: &Key) -> GatewayResult<()> {
        if key.requests_limit == 0 {
            return Ok(());
        }

        let count = self
            .total_requests
            .get_counter(&key.key_id)
            .await
            .map_err(|err| counter_failure(key, &err, "failed to get total requests"))?;

        if count >= i64::try_from(key.requests_limit).unwrap_or(i64::MAX) {
            return Err(GatewayError::expiration(
                format!("total requests limit: {}, has been reached", key.requests_limit),
                ExpirationKind::RequestsLimitExpiration,
            ));
        }
        Ok(())
    }

    async fn check_rate_limit(&self, key: &Key) -> GatewayResult<()> {
        if key.rate_limit_over_time == 0 {
            return Ok(());
        }
        let unit: TimeUnit = key.rate_limit_unit;

        let count = self
            .rate
            .get_counter(&key.key_id, unit)
            .await
            .map_err(|err| counter_failure(key, &err, "failed to get rate limit counter"))?;

        if count >= i64::try_from(key.rate_limit_over_time).unwrap_or(i64::MAX) {
            return Err(GatewayError::rate_limit(format!(
                "key exceeded rate limit {} requests per {unit}",
                key.rate_limit_over_time
            )));
        }
        Ok(())
    }

    async fn check_cost_limit_over_time(&self, key: &Key) -> GatewayResult<()> {
        if key.cost_limit_in_usd_over_time == 0.0 {
            return Ok(());
        }
        let unit = key.cost_limit_in_usd_unit;

        let spent = self
            .cost_over_time
            .get_counter(&key.key_id, unit)
            .await
            .map_err(|err| counter_failure(key, &err, "failed to get cached token cost"))?;

        if spent >= usd_to_micros(key.cost_limit_in_usd_over_time) {
            return Err(GatewayError::cost_limit(format!(
                "cost limit: {:.6} has been reached for the current time period: {unit}",
                key.cost_limit_in_usd_over_time
            )));
        }
        Ok(())
    }

    async fn check_cost_limit(&self, key: &Key) -> GatewayResult<()> {
        if key.cost_limit_in_usd == 0.0 {
            return Ok(());
        }

        let spent = self
            .total_cost
            .get_counter(&key.key_id)
            .await
            .map_err(|err| counter_failure(key, &err, "failed to get total token cost"))?;

        if spent >= usd_to_micros(key.cost_limit_in_usd) {
            return Err(GatewayError::expiration(
                format!("total cost limit: {:.6} has been reached", key.cost_limit_in_usd),
                ExpirationKind::CostLimitExpiration,
            ));
        }
        Ok(())
    }
}

fn counter_failure(key: &Key, err: &dyn std::fmt::Display, message: &str) -> GatewayError {
    warn!(key_id = %key.key_id, error = %err, "{message}");
    GatewayError::collaborator(message)
}

impl std::fmt::Debug for LimitValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimitValidator")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
