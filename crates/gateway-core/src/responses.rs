//! Responses API shapes used for cost accounting.

use serde::{Deserialize, Serialize};

/// Default container memory limit when a request does not name one.
pub const DEFAULT_CONTAINER_MEMORY_LIMIT: &str = "1g";

/// Responses API request; only pricing-relevant fields are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseRequest {
    /// Target model
    #[serde(default)]
    pub model: String,

    /// Hosted tools enabled for the request
    #[serde(default)]
    pub tools: Vec<ResponseTool>,

    /// Enable streaming response
    #[serde(default)]
    pub stream: bool,
}

/// A hosted tool entry, as found in requests and in completed responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseTool {
    /// Tool type (e.g. "web_search_preview", "code_interpreter")
    #[serde(rename = "type")]
    pub tool_type: String,

    /// Container spec for code interpreter; an object or an existing container id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<serde_json::Value>,
}

impl ResponseTool {
    /// Create a tool of the given type
    #[must_use]
    pub fn new(tool_type: impl Into<String>) -> Self {
        Self {
            tool_type: tool_type.into(),
            container: None,
        }
    }

    /// Attach a container spec
    #[must_use]
    pub fn with_container(mut self, container: serde_json::Value) -> Self {
        self.container = Some(container);
        self
    }

    /// Container spec when given as an object; ids of existing containers yield `None`.
    #[must_use]
    pub fn container_spec(&self) -> Option<ToolContainer> {
        let object = self.container.as_ref()?.as_object()?;
        let container_type = object
            .get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("auto")
            .to_string();
        let memory_limit = object
            .get("memory_limit")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        Some(ToolContainer {
            container_type,
            memory_limit,
        })
    }
}

/// Code interpreter container spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContainer {
    /// Container type, "auto" creates a new container
    pub container_type: String,
    /// Requested memory limit
    pub memory_limit: Option<String>,
}

impl ToolContainer {
    /// Memory limit, defaulting to `1g`.
    #[must_use]
    pub fn memory_limit(&self) -> &str {
        self.memory_limit
            .as_deref()
            .unwrap_or(DEFAULT_CONTAINER_MEMORY_LIMIT)
    }
}

/// Token usage reported by the Responses API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseUsage {
    /// Input tokens, including cached ones
    #[serde(default)]
    pub input_tokens: u64,

    /// Breakdown of input tokens
    #[serde(default)]
    pub input_tokens_details: InputTokensDetails,

    /// Output tokens
    #[serde(default)]
    pub output_tokens: u64,

    /// Total tokens
    #[serde(default)]
    pub total_tokens: u64,
}

/// Input token breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputTokensDetails {
    /// Tokens served from the prompt cache
    #[serde(default)]
    pub cached_tokens: u64,
}

/// A Responses API response object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseObject {
    /// Response id
    #[serde(default)]
    pub id: String,

    /// Lifecycle status, "completed" when usage is final
    #[serde(default)]
    pub status: String,

    /// Model that served the response
    #[serde(default)]
    pub model: String,

    /// Usage figures
    #[serde(default)]
    pub usage: ResponseUsage,

    /// Tools active for the response
    #[serde(default)]
    pub tools: Vec<ResponseTool>,
}

impl ResponseObject {
    /// Whether the usage figures are final.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

/// One server-sent event of a streamed Responses API call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseStreamEvent {
    /// Event type, e.g. "response.output_text.delta"
    #[serde(rename = "type", default)]
    pub event_type: String,

    /// Text delta for output text events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,

    /// Response snapshot for lifecycle events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseObject>,
}

impl ResponseStreamEvent {
    /// Text delta carried by an output text event.
    #[must_use]
    pub fn text_delta(&self) -> Option<&str> {
        if self.event_type == "response.output_text.delta" {
            self.delta.as_deref()
        } else {
            None
        }
    }

    /// The completed response, if this event carries one.
    #[must_use]
    pub fn completed_response(&self) -> Option<&ResponseObject> {
        self.response.as_ref().filter(|r| r.is_completed())
    }
}
