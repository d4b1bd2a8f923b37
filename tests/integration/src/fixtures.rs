//! Test fixtures and sample data for integration tests

use gateway_core::{ChatCompletionRequest, ChatMessage, InboundRequest, Key, ProviderSetting};
use gateway_security::HashingService;
use serde_json::json;

/// Raw gateway key presented by test callers
pub const RAW_KEY: &str = "gw-live-0123456789abcdef";

/// Id of the test key
pub const KEY_ID: &str = "key-1";

/// Epoch second the test clock starts at
pub const NOW: i64 = 1_700_000_000;

/// Test key linked to `settings`, stored by hash
pub fn gateway_key(settings: &[&str]) -> Key {
    Key::new(KEY_ID, HashingService::hash_key(RAW_KEY))
        .with_created_at(NOW)
        .with_setting_ids(settings.iter().copied())
}

/// OpenAI setting with a plaintext key
pub fn openai_setting(id: &str, api_key: &str) -> ProviderSetting {
    ProviderSetting::new(id, "openai").with_param("apikey", api_key)
}

/// Anthropic setting with a plaintext key
pub fn anthropic_setting(id: &str, api_key: &str) -> ProviderSetting {
    ProviderSetting::new(id, "anthropic").with_param("apikey", api_key)
}

/// Request presenting the test key as a bearer token
pub fn bearer_request(path: &str) -> InboundRequest {
    InboundRequest::new(path)
        .with_header("authorization", &format!("Bearer {RAW_KEY}"))
        .expect("valid header")
}

/// Request presenting the test key in `x-api-key`
pub fn api_key_request(path: &str) -> InboundRequest {
    InboundRequest::new(path)
        .with_header("x-api-key", RAW_KEY)
        .expect("valid header")
}

/// Chat request with a system and a user message
pub fn chat_request(model: &str) -> ChatCompletionRequest {
    ChatCompletionRequest::builder()
        .model(model)
        .message(ChatMessage::system("You are terse"))
        .message(ChatMessage::user("What is the capital of France?"))
        .build()
        .expect("valid request")
}

/// SSE lines of a streamed Responses API call that ends with usage
pub fn responses_stream(input_tokens: u64, cached_tokens: u64, output_tokens: u64) -> Vec<String> {
    let completed = json!({
        "type": "response.completed",
        "response": {
            "id": "resp_1",
            "status": "completed",
            "model": "gpt-4o",
            "usage": {
                "input_tokens": input_tokens,
                "input_tokens_details": {"cached_tokens": cached_tokens},
                "output_tokens": output_tokens,
                "total_tokens": input_tokens + output_tokens
            },
            "tools": [{"type": "web_search_preview"}]
        }
    });

    vec![
        "event: response.created".to_string(),
        r#"data: {"type":"response.created","response":{"id":"resp_1","status":"in_progress"}}"#
            .to_string(),
        String::new(),
        "event: response.output_text.delta".to_string(),
        r#"data: {"type":"response.output_text.delta","delta":"Paris"}"#.to_string(),
        String::new(),
        "event: response.output_text.delta".to_string(),
        r#"data: {"type":"response.output_text.delta","delta":" it is."}"#.to_string(),
        String::new(),
        "event: response.completed".to_string(),
        format!("data: {completed}"),
        String::new(),
        "data: [DONE]".to_string(),
    ]
}
