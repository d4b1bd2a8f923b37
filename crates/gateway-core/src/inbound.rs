//! The slice of an inbound HTTP request the pipeline reads and rewrites.

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{GatewayError, GatewayResult};

/// Path namespace for custom-provider requests.
pub const CUSTOM_PROVIDER_PREFIX: &str = "/api/providers/xCustom/";

/// Inbound request: headers, path and query.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
}

impl InboundRequest {
    /// Create a request for `path` with no headers or query.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Parse a request target such as `/api/x?a=1&b=2`.
    #[must_use]
    pub fn from_uri(uri: &str) -> Self {
        let (path, query) = uri.split_once('?').unwrap_or((uri, ""));
        Self {
            path: path.to_string(),
            query: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
            headers: HeaderMap::new(),
        }
    }

    /// Add a header.
    ///
    /// # Errors
    /// Returns a validation error for an invalid header name or value
    pub fn with_header(mut self, name: &str, value: &str) -> GatewayResult<Self> {
        self.set_header(name, value)?;
        Ok(self)
    }

    /// Add a query parameter
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Request path without the query.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// All headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Replace every value of a header.
    ///
    /// # Errors
    /// Returns a validation error for an invalid header name or value
    pub fn set_header(&mut self, name: &str, value: &str) -> GatewayResult<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| GatewayError::validation(format!("invalid header name {name}: {e}")))?;
        let mut value = HeaderValue::from_str(value)
            .map_err(|e| GatewayError::validation(format!("invalid header value: {e}")))?;
        value.set_sensitive(true);
        self.headers.insert(name, value);
        Ok(())
    }

    /// First value of a query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replace every value of a query parameter.
    pub fn set_query_param(&mut self, name: &str, value: impl Into<String>) {
        self.query.retain(|(k, _)| k != name);
        self.query.push((name.to_string(), value.into()));
    }

    /// Encoded query string, without the leading `?`.
    #[must_use]
    pub fn query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish()
    }

    /// Path plus encoded query.
    #[must_use]
    pub fn request_uri(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string())
        }
    }

    /// Whether the request targets the custom-provider namespace.
    #[must_use]
    pub fn is_custom_provider_request(&self) -> bool {
        self.path.starts_with(CUSTOM_PROVIDER_PREFIX)
    }
}
