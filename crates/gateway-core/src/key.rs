//! Caller credential records.

use serde::{Deserialize, Serialize};

/// Length of the mask appended after the visible prefix of a long secret.
const LONG_MASK_LEN: usize = 46;

/// Number of characters of a secret that may ever be revealed.
const VISIBLE_PREFIX: usize = 5;

/// Window a rate or cost counter is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeUnit {
    /// Per minute
    #[serde(rename = "m")]
    Minute,
    /// Per hour
    #[serde(rename = "h")]
    Hour,
    /// Per day
    #[default]
    #[serde(rename = "d")]
    Day,
    /// Per month
    #[serde(rename = "mo")]
    Month,
}

impl TimeUnit {
    /// Wire name of the unit.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "m",
            Self::Hour => "h",
            Self::Day => "d",
            Self::Month => "mo",
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller credential together with its usage limits.
///
/// Zero-valued limits mean "unlimited".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    /// Unique key identifier
    pub key_id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// One-way hash of the secret
    #[serde(default)]
    pub hashed_key: String,

    /// Whether the key has been revoked
    #[serde(default)]
    pub revoked: bool,

    /// Time-to-live as a duration string ("10s", "1h30m"); empty or zero is unlimited
    #[serde(default)]
    pub ttl: String,

    /// Creation time in epoch seconds
    #[serde(default)]
    pub created_at: i64,

    /// Lifetime request limit
    #[serde(default)]
    pub requests_limit: u64,

    /// Requests allowed per `rate_limit_unit`
    #[serde(default)]
    pub rate_limit_over_time: u64,

    /// Window for `rate_limit_over_time`
    #[serde(default)]
    pub rate_limit_unit: TimeUnit,

    /// Lifetime spend limit in USD
    #[serde(default)]
    pub cost_limit_in_usd: f64,

    /// Spend allowed per `cost_limit_in_usd_unit`
    #[serde(default)]
    pub cost_limit_in_usd_over_time: f64,

    /// Window for `cost_limit_in_usd_over_time`
    #[serde(default)]
    pub cost_limit_in_usd_unit: TimeUnit,

    /// Pick a provider setting at random on each request
    #[serde(default)]
    pub rotation_enabled: bool,

    /// Linked provider setting identifiers, in resolution order
    #[serde(default)]
    pub setting_ids: Vec<String>,

    /// Free-form tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Key {
    /// Create a new key with no limits.
    #[must_use]
    pub fn new(key_id: impl Into<String>, hashed_key: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            hashed_key: hashed_key.into(),
            ..Self::default()
        }
    }

    /// Linked setting ids with duplicates removed, first occurrence wins.
    #[must_use]
    pub fn linked_setting_ids(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.setting_ids
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Set the ttl
    #[must_use]
    pub fn with_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.ttl = ttl.into();
        self
    }

    /// Set the creation time
    #[must_use]
    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Mark the key revoked
    #[must_use]
    pub fn with_revoked(mut self, revoked: bool) -> Self {
        self.revoked = revoked;
        self
    }

    /// Set the lifetime request limit
    #[must_use]
    pub fn with_requests_limit(mut self, limit: u64) -> Self {
        self.requests_limit = limit;
        self
    }

    /// Set the windowed rate limit
    #[must_use]
    pub fn with_rate_limit(mut self, limit: u64, unit: TimeUnit) -> Self {
        self.rate_limit_over_time = limit;
        self.rate_limit_unit = unit;
        self
    }

    /// Set the lifetime cost limit
    #[must_use]
    pub fn with_cost_limit(mut self, usd: f64) -> Self {
        self.cost_limit_in_usd = usd;
        self
    }

    /// Set the windowed cost limit
    #[must_use]
    pub fn with_cost_limit_over_time(mut self, usd: f64, unit: TimeUnit) -> Self {
        self.cost_limit_in_usd_over_time = usd;
        self.cost_limit_in_usd_unit = unit;
        self
    }

    /// Enable or disable rotation
    #[must_use]
    pub fn with_rotation(mut self, enabled: bool) -> Self {
        self.rotation_enabled = enabled;
        self
    }

    /// Link provider settings
    #[must_use]
    pub fn with_setting_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.setting_ids = ids.into_iter().map(Into::into).collect();
        self
    }
}

/// Mask a secret for logs and error text.
///
/// Never reveals more than the first five characters.
#[must_use]
pub fn anonymize(input: &str) -> String {
    let mut chars = input.chars();
    match input.chars().count() {
        0 => String::new(),
        n if n <= VISIBLE_PREFIX => {
            let first = chars.next().map(String::from).unwrap_or_default();
            format!("{first}*****")
        }
        _ => {
            let prefix: String = chars.take(VISIBLE_PREFIX).collect();
            format!("{prefix}{}", "*".repeat(LONG_MASK_LEN))
        }
    }
}
