//! Upstream provider settings and the per-provider policy table.
//!
//! Provider-specific behavior (which request paths a setting may serve, which
//! header carries the upstream secret, which fields are required) lives in
//! [`PROVIDER_POLICIES`]. Adding a provider is a new row, not a new branch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known parameter names inside a provider setting.
pub mod params {
    /// Upstream API key
    pub const API_KEY: &str = "apikey";
    /// AWS access key id
    pub const AWS_ACCESS_KEY_ID: &str = "awsAccessKeyId";
    /// AWS secret access key
    pub const AWS_SECRET_ACCESS_KEY: &str = "awsSecretAccessKey";
    /// AWS region
    pub const AWS_REGION: &str = "awsRegion";
    /// Azure resource name
    pub const RESOURCE_NAME: &str = "resourceName";
    /// vLLM base url
    pub const URL: &str = "url";
    /// Custom provider endpoint
    pub const ENDPOINT: &str = "endpoint";
    /// Custom provider auth location (`header` or `query`)
    pub const AUTH_LOCATION: &str = "authLocation";
    /// Custom provider compact auth template
    pub const AUTH_TEMPLATE: &str = "authTemplate";
    /// Derived header or query parameter name
    pub const AUTH_TARGET: &str = "authTarget";
    /// Derived mask containing the `{{apikey}}` placeholder
    pub const AUTH_MASK: &str = "authMask";
}

/// Closed set of natively supported providers, plus custom ones by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// OpenAI
    OpenAi,
    /// Anthropic
    Anthropic,
    /// Azure OpenAI
    Azure,
    /// vLLM
    Vllm,
    /// DeepInfra
    DeepInfra,
    /// AWS Bedrock
    Bedrock,
    /// Legacy AWS provider name
    Amazon,
    /// Any other provider, registered by name
    Custom(String),
}

impl ProviderKind {
    /// Parse a provider name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        PROVIDER_POLICIES
            .iter()
            .find(|p| p.name == name)
            .map_or_else(|| Self::Custom(name.to_string()), |p| p.kind.clone())
    }

    /// Provider name as stored.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Custom(name) => name,
            kind => kind.policy().map_or("", |p| p.name),
        }
    }

    /// Policy row for native providers.
    #[must_use]
    pub fn policy(&self) -> Option<&'static ProviderPolicy> {
        PROVIDER_POLICIES.iter().find(|p| &p.kind == self)
    }

    /// Whether the provider is natively supported.
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.policy().is_some()
    }

    /// Whether a setting of this provider may serve `path`.
    ///
    /// Providers without a path restriction may serve any path.
    #[must_use]
    pub fn can_access_path(&self, path: &str) -> bool {
        self.policy()
            .and_then(|p| p.access_prefix)
            .map_or(true, |prefix| path.starts_with(prefix))
    }

    /// Parameter holding the secret that is encrypted at rest.
    #[must_use]
    pub fn secret_param(&self) -> &'static str {
        self.policy().map_or(params::API_KEY, |p| p.secret_param)
    }

    /// Whether an empty API key is acceptable for outbound dispatch.
    #[must_use]
    pub fn allows_empty_api_key(&self) -> bool {
        self.policy().is_some_and(|p| p.empty_api_key_allowed)
    }

    /// Whether the secret is encrypted at rest when an encryptor is enabled.
    #[must_use]
    pub fn encrypts_secret(&self) -> bool {
        self.policy().is_some_and(|p| p.encrypt_secret)
    }

    /// Required non-empty parameters for native providers.
    #[must_use]
    pub fn required_params(&self) -> &'static [&'static str] {
        self.policy().map_or(&[], |p| p.required_params)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How the upstream secret is placed on an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthHeader {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `Authorization: Bearer <key>` only when a key is present
    OptionalBearer,
    /// The key verbatim in the named header
    Named(&'static str),
}

/// Static per-provider policy.
#[derive(Debug)]
pub struct ProviderPolicy {
    /// Provider variant
    pub kind: ProviderKind,
    /// Stored provider name
    pub name: &'static str,
    /// Path prefix a setting of this provider is restricted to
    pub access_prefix: Option<&'static str>,
    /// Parameter holding the at-rest-encrypted secret
    pub secret_param: &'static str,
    /// Whether the secret is encrypted on create/update
    pub encrypt_secret: bool,
    /// Whether an empty API key is allowed (ambient credentials)
    pub empty_api_key_allowed: bool,
    /// Parameters that must be non-empty
    pub required_params: &'static [&'static str],
}

/// Policy table for natively supported providers.
pub static PROVIDER_POLICIES: &[ProviderPolicy] = &[
    ProviderPolicy {
        kind: ProviderKind::OpenAi,
        name: "openai",
        access_prefix: Some("/api/providers/openai"),
        secret_param: params::API_KEY,
        encrypt_secret: true,
        empty_api_key_allowed: false,
        required_params: &[params::API_KEY],
    },
    ProviderPolicy {
        kind: ProviderKind::Anthropic,
        name: "anthropic",
        access_prefix: Some("/api/providers/anthropic"),
        secret_param: params::API_KEY,
        encrypt_secret: true,
        empty_api_key_allowed: false,
        required_params: &[params::API_KEY],
    },
    ProviderPolicy {
        kind: ProviderKind::Azure,
        name: "azure",
        access_prefix: Some("/api/providers/azure/openai"),
        secret_param: params::API_KEY,
        encrypt_secret: true,
        empty_api_key_allowed: false,
        required_params: &[params::RESOURCE_NAME, params::API_KEY],
    },
    ProviderPolicy {
        kind: ProviderKind::Vllm,
        name: "vllm",
        access_prefix: Some("/api/providers/vllm"),
        secret_param: params::API_KEY,
        encrypt_secret: false,
        empty_api_key_allowed: false,
        required_params: &[params::URL],
    },
    ProviderPolicy {
        kind: ProviderKind::DeepInfra,
        name: "deepinfra",
        access_prefix: None,
        secret_param: params::API_KEY,
        encrypt_secret: true,
        empty_api_key_allowed: false,
        required_params: &[params::API_KEY],
    },
    ProviderPolicy {
        kind: ProviderKind::Bedrock,
        name: "bedrock",
        access_prefix: Some("/api/providers/bedrock"),
        secret_param: params::AWS_SECRET_ACCESS_KEY,
        encrypt_secret: true,
        empty_api_key_allowed: true,
        required_params: &[
            params::AWS_ACCESS_KEY_ID,
            params::AWS_SECRET_ACCESS_KEY,
            params::AWS_REGION,
        ],
    },
    ProviderPolicy {
        kind: ProviderKind::Amazon,
        name: "amazon",
        access_prefix: None,
        secret_param: params::AWS_SECRET_ACCESS_KEY,
        encrypt_secret: true,
        empty_api_key_allowed: true,
        required_params: &[
            params::AWS_ACCESS_KEY_ID,
            params::AWS_SECRET_ACCESS_KEY,
            params::AWS_REGION,
        ],
    },
];

/// Outbound header policy by request-path namespace, checked in order.
pub static PATH_AUTH_HEADERS: &[(&str, AuthHeader)] = &[
    ("/api/providers/vllm", AuthHeader::OptionalBearer),
    ("/api/providers/anthropic", AuthHeader::Named("x-api-key")),
    ("/api/providers/azure", AuthHeader::Named("api-key")),
];

/// Header policy for a request path; defaults to bearer.
#[must_use]
pub fn auth_header_for_path(path: &str) -> AuthHeader {
    PATH_AUTH_HEADERS
        .iter()
        .find(|(prefix, _)| path.starts_with(prefix))
        .map_or(AuthHeader::Bearer, |(_, header)| *header)
}

/// A stored upstream credential bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSetting {
    /// Setting identifier
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Provider name
    pub provider: String,

    /// Parameters, including secrets
    #[serde(default)]
    pub setting: BTreeMap<String, String>,

    /// Creation time in epoch seconds
    #[serde(default)]
    pub created_at: i64,

    /// Last update in epoch seconds; the decryption context tag
    #[serde(default)]
    pub updated_at: i64,

    /// Models this setting may be used with (empty = any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_models: Vec<String>,
}

impl ProviderSetting {
    /// Create a setting for `provider`.
    #[must_use]
    pub fn new(id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider: provider.into(),
            ..Self::default()
        }
    }

    /// Add a parameter
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.setting.insert(name.into(), value.into());
        self
    }

    /// Set the update timestamp
    #[must_use]
    pub fn with_updated_at(mut self, updated_at: i64) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Provider variant.
    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        ProviderKind::from_name(&self.provider)
    }

    /// Parameter value, empty when absent.
    #[must_use]
    pub fn param(&self, name: &str) -> &str {
        self.setting.get(name).map_or("", String::as_str)
    }

    /// Upstream API key, empty when absent.
    #[must_use]
    pub fn api_key(&self) -> &str {
        self.param(params::API_KEY)
    }
}

/// Partial update to a provider setting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingUpdate {
    /// New display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Parameters to merge
    #[serde(default)]
    pub setting: BTreeMap<String, String>,

    /// New update timestamp, filled by the manager
    #[serde(default)]
    pub updated_at: i64,

    /// Replacement allowed-models list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_models: Option<Vec<String>>,
}

/// A registered non-native provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomProvider {
    /// Provider name
    pub provider: String,

    /// Parameter that must be present on its settings
    #[serde(default)]
    pub authentication_param: String,
}
