//! Cost estimation and streamed usage accounting

use std::sync::Arc;

use gateway_config::PricingConfig;
use gateway_core::{ChatMessage, GatewayError, ResponseRequest, ResponseTool, TextInput};
use gateway_telemetry::cost::category;
use gateway_telemetry::{PriceTable, ResponsesStreamAccumulator, WhitespaceTokenCounter};
use llm_metering_gateway::CostEstimators;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::fixtures::*;

fn estimators() -> CostEstimators {
    CostEstimators::from_config(&PricingConfig::default(), Arc::new(WhitespaceTokenCounter))
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_chat_prompt_cost() {
    let estimators = estimators();
    let (tokens, cost) = estimators
        .openai
        .estimate_chat_completion_prompt_cost_with_token_counts(&chat_request("gpt-4o"))
        .unwrap();

    // primer 3, system "You are terse\n" 3+1+3, user 6+1+3
    assert_eq!(tokens, 20);
    assert_close(cost, 20.0 / 1000.0 * 0.002_5);
}

#[test]
fn test_stream_completion_cost() {
    let estimators = estimators();
    let (tokens, cost) = estimators
        .openai
        .estimate_chat_completion_stream_cost_with_token_counts("gpt-4o-mini", "Paris it is.")
        .unwrap();

    assert_eq!(tokens, 3);
    assert_close(cost, 3.0 / 1000.0 * 0.000_6);
}

#[test]
fn test_legacy_completions_prompt() {
    let estimators = estimators();
    let prompt = TextInput::Many(vec!["one two".to_string(), "three".to_string()]);
    let (tokens, _) = estimators
        .openai
        .estimate_completions_request_cost_with_token_counts("gpt-4o", &prompt)
        .unwrap();

    assert_eq!(tokens, 2);
}

#[test]
fn test_unknown_model_is_reported() {
    let estimators = estimators();
    let err = estimators
        .openai
        .estimate_total_cost("not-a-model", 10, 10)
        .unwrap_err();

    assert_eq!(err, GatewayError::model_not_supported("not-a-model", category::PROMPT));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_configured_override_wins() {
    let pricing = PricingConfig {
        openai: PriceTable::new().with_rate(category::PROMPT, "gpt-4o", 1.0),
        ..PricingConfig::default()
    };
    let estimators = CostEstimators::from_config(&pricing, Arc::new(WhitespaceTokenCounter));

    assert_close(estimators.openai.estimate_prompt_cost("gpt-4o", 1000).unwrap(), 1.0);
    assert_close(
        estimators.openai.estimate_completion_cost("gpt-4o", 1000).unwrap(),
        0.01,
    );
}

#[test]
fn test_anthropic_bedrock_alias() {
    let estimators = estimators();
    let native = estimators
        .anthropic
        .estimate_total_cost("claude-3-haiku-20240307", 1_000_000, 1_000_000)
        .unwrap();
    let bedrock = estimators
        .anthropic
        .estimate_total_cost("us.anthropic.claude-3-haiku-20240307-v1:0", 1_000_000, 1_000_000)
        .unwrap();

    assert_close(native, 0.25 + 1.25);
    assert_close(bedrock, native);
}

#[test]
fn test_anthropic_message_tokens() {
    let estimators = estimators();
    let messages = vec![ChatMessage::user("hello there"), ChatMessage::assistant("hi")];
    let tokens = estimators
        .anthropic
        .count_messages_tokens("claude-3-haiku", &messages)
        .unwrap();

    assert_eq!(tokens, (2 + 4) + (1 + 4) + 4);
}

#[test]
fn test_responses_stream_accounting() {
    let estimators = estimators();
    let request = ResponseRequest {
        model: "gpt-4o".to_string(),
        tools: vec![
            ResponseTool::new("web_search_preview"),
            ResponseTool::new("code_interpreter").with_container(json!({"type": "auto"})),
        ],
        stream: true,
    };
    let mut accumulator =
        ResponsesStreamAccumulator::new(estimators.openai.clone(), "gpt-4o").with_request(request);

    let body = responses_stream(1000, 200, 500).join("\n") + "\n";
    // Split mid-line to exercise reassembly
    let (head, tail) = body.as_bytes().split_at(body.len() / 2);
    assert!(accumulator.feed_chunk(head));
    assert!(!accumulator.feed_chunk(tail));
    assert!(accumulator.is_done());

    let usage = accumulator.finish();
    assert_eq!(usage.content, "Paris it is.");
    assert_eq!(usage.prompt_tokens, 1000);
    assert_eq!(usage.completion_tokens, 500);
    assert!(usage.completed);

    let tokens = 800.0 / 1000.0 * 0.002_5 + 200.0 / 1000.0 * 0.001_25 + 500.0 / 1000.0 * 0.01;
    let container = 0.03;
    let tools = 25.0 / 1000.0;
    assert_close(usage.cost_in_usd, tokens + container + tools);
}

#[test]
fn test_stream_without_completion_costs_nothing() {
    let estimators = estimators();
    let mut accumulator = ResponsesStreamAccumulator::new(estimators.openai.clone(), "gpt-4o");

    assert!(accumulator.feed_line(r#"data: {"type":"response.output_text.delta","delta":"Hi"}"#));
    assert!(accumulator.feed_line("data: not json"));
    assert!(!accumulator.feed_line("data: [DONE]"));

    assert_eq!(accumulator.content(), "Hi");
    assert_close(accumulator.cost_in_usd(), 0.0);
}
