//! Custom multi-step routes.

use serde::{Deserialize, Serialize};

/// Path namespace for custom routes.
pub const ROUTE_PREFIX: &str = "/api/routes";

/// One step of a route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Provider the step calls
    pub provider: String,

    /// Model the step calls
    #[serde(default)]
    pub model: String,
}

/// A named multi-provider call sequence with its own key allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Route identifier
    #[serde(default)]
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Path relative to the route namespace
    pub path: String,

    /// Keys allowed to call the route
    #[serde(default)]
    pub key_ids: Vec<String>,

    /// Ordered steps
    #[serde(default)]
    pub steps: Vec<RouteStep>,
}

impl Route {
    /// Create a route at `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Allow a key
    #[must_use]
    pub fn allow_key(mut self, key_id: impl Into<String>) -> Self {
        self.key_ids.push(key_id.into());
        self
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        self.steps.push(RouteStep {
            provider: provider.into(),
            model: model.into(),
        });
        self
    }

    /// Whether `key_id` is on the allow-list.
    #[must_use]
    pub fn allows(&self, key_id: &str) -> bool {
        self.key_ids.iter().any(|id| id == key_id)
    }

    /// Distinct providers required by the steps, in first-use order.
    #[must_use]
    pub fn required_providers(&self) -> Vec<&str> {
        let mut providers: Vec<&str> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            if !providers.contains(&step.provider.as_str()) {
                providers.push(&step.provider);
            }
        }
        providers
    }
}

/// Whether `path` is inside the route namespace.
#[must_use]
pub fn is_route_path(path: &str) -> bool {
    path.starts_with(ROUTE_PREFIX)
}

/// Route lookup path for a request path.
#[must_use]
pub fn route_lookup_path(path: &str) -> &str {
    path.strip_prefix(ROUTE_PREFIX).unwrap_or(path)
}
