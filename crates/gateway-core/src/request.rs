//! Request bodies the cost estimators inspect.
//!
//! Only the fields that influence token counting and pricing are modelled;
//! anything else in the upstream body is ignored on deserialization.

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};

/// OpenAI-style chat completion request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Target model (e.g., "gpt-4o")
    pub model: String,

    /// Chat messages for conversation
    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    /// Legacy function definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionDefinition>,

    /// Tool definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Enable streaming response
    #[serde(default)]
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// Create a new builder for `ChatCompletionRequest`
    #[must_use]
    pub fn builder() -> ChatCompletionRequestBuilder {
        ChatCompletionRequestBuilder::default()
    }

    /// Function definitions from both `functions` and function-typed `tools`.
    pub fn function_definitions(&self) -> impl Iterator<Item = &FunctionDefinition> {
        self.functions.iter().chain(
            self.tools
                .iter()
                .filter(|t| t.tool_type == "function")
                .map(|t| &t.function),
        )
    }

    /// Whether any function definitions are attached.
    #[must_use]
    pub fn has_functions(&self) -> bool {
        self.function_definitions().next().is_some()
    }
}

/// Builder for `ChatCompletionRequest`
#[derive(Debug, Default)]
pub struct ChatCompletionRequestBuilder {
    model: Option<String>,
    messages: Vec<ChatMessage>,
    functions: Vec<FunctionDefinition>,
    tools: Vec<ToolDefinition>,
    stream: bool,
}

impl ChatCompletionRequestBuilder {
    /// Set the model
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add a message
    #[must_use]
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Add a legacy function definition
    #[must_use]
    pub fn function(mut self, function: FunctionDefinition) -> Self {
        self.functions.push(function);
        self
    }

    /// Add a tool definition
    #[must_use]
    pub fn tool(mut self, tool: ToolDefinition) -> Self {
        self.tools.push(tool);
        self
    }

    /// Enable streaming
    #[must_use]
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Build the request
    ///
    /// # Errors
    /// Returns error if the model is missing
    pub fn build(self) -> GatewayResult<ChatCompletionRequest> {
        let model = self
            .model
            .filter(|m| !m.is_empty())
            .ok_or_else(|| GatewayError::validation("model is not provided"))?;

        Ok(ChatCompletionRequest {
            model,
            messages: self.messages,
            functions: self.functions,
            tools: self.tools,
            stream: self.stream,
        })
    }
}

/// Chat message with role and content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message author
    pub role: MessageRole,

    /// Content of the message; `null` reads as empty text
    #[serde(default, deserialize_with = "nullable_content")]
    pub content: MessageContent,

    /// Optional name of the author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Legacy function call made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl ChatMessage {
    fn with_role(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
            name: None,
            function_call: None,
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content)
    }

    /// Create a function result message
    #[must_use]
    pub fn function(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Function, content).with_name(name)
    }

    /// Set the author name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a function call
    #[must_use]
    pub fn with_function_call(mut self, call: FunctionCall) -> Self {
        self.function_call = Some(call);
        self
    }

    /// Text of the message, multimodal text parts concatenated.
    #[must_use]
    pub fn text(&self) -> String {
        self.content.text()
    }
}

fn nullable_content<'de, D>(deserializer: D) -> Result<MessageContent, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<MessageContent>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// Tool response message
    Tool,
    /// Legacy function result message
    Function,
}

impl MessageRole {
    /// Wire name of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::Function => "function",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message content (text or multimodal parts)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content
    Text(String),
    /// Multimodal content parts
    Parts(Vec<ContentPart>),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl MessageContent {
    /// Text content, text parts concatenated.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect(),
        }
    }
}

/// Content part for multimodal messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text content part
    Text {
        /// The text content
        text: String,
    },
    /// Image content part
    ImageUrl {
        /// Image URL details
        image_url: serde_json::Value,
    },
}

/// Tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool type
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function definition
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    /// Wrap a function definition as a function tool
    #[must_use]
    pub fn function(function: FunctionDefinition) -> Self {
        Self {
            tool_type: "function".to_string(),
            function,
        }
    }
}

/// Function definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,
    /// Function description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Function parameters (JSON Schema)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

impl FunctionDefinition {
    /// Create a function definition with no parameters
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters: None,
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the JSON Schema parameters
    #[must_use]
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// Function call details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// Function arguments as JSON string
    pub arguments: String,
}

/// A string or a list of strings, as accepted by embeddings and legacy completions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextInput {
    /// Single string
    Single(String),
    /// Several strings
    Many(Vec<String>),
}

impl TextInput {
    /// All input text concatenated.
    #[must_use]
    pub fn joined(&self) -> String {
        match self {
            Self::Single(s) => s.clone(),
            Self::Many(items) => items.concat(),
        }
    }
}

impl Default for TextInput {
    fn default() -> Self {
        Self::Single(String::new())
    }
}

/// Embeddings request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Embedding model
    pub model: String,
    /// Input text
    #[serde(default)]
    pub input: TextInput,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = ChatCompletionRequest::builder()
            .model("gpt-4o")
            .message(ChatMessage::user("Hello"))
            .build()
            .expect("should build");

        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.messages.len(), 1);
        assert!(!request.has_functions());
    }

    #[test]
    fn test_request_builder_missing_model() {
        let request = ChatCompletionRequest::builder()
            .message(ChatMessage::user("Hello"))
            .build();

        assert!(matches!(request, Err(GatewayError::Validation(_))));
    }

    #[test]
    fn test_function_definitions_include_function_tools() {
        let request = ChatCompletionRequest::builder()
            .model("gpt-4o")
            .function(FunctionDefinition::new("a"))
            .tool(ToolDefinition::function(FunctionDefinition::new("b")))
            .build()
            .expect("should build");

        let names: Vec<&str> = request.function_definitions().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_deserialize_openai_body() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "gpt-4o",
            "temperature": 0.2,
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": [
                    {"type": "text", "text": "look "},
                    {"type": "image_url", "image_url": {"url": "https://x"}},
                    {"type": "text", "text": "here"}
                ]},
                {"role": "assistant", "content": null, "function_call": {"name": "f", "arguments": "{}"}}
            ]
        }))
        .expect("deserialize");

        assert_eq!(request.messages[1].text(), "look here");
        assert!(request.messages[2].function_call.is_some());
    }

    #[test]
    fn test_text_input_joined() {
        let input: TextInput = serde_json::from_value(json!(["a", "b"])).expect("deserialize");
        assert_eq!(input.joined(), "ab");
    }
}
