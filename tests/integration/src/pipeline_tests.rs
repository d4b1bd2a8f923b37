//! End-to-end admission through the metering pipeline

use std::collections::BTreeSet;
use std::sync::Arc;

use gateway_core::{ExpirationKind, GatewayError, Route};
use gateway_security::{RandomRotation, SeededRotation};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use crate::fixtures::*;
use crate::helpers::*;

const OPENAI_CHAT: &str = "/api/providers/openai/v1/chat/completions";
const ANTHROPIC_MESSAGES: &str = "/api/providers/anthropic/v1/messages";

#[tokio::test]
async fn test_openai_request_is_admitted_and_rewritten() {
    let gateway = TestGateway::new();
    gateway
        .add_key(gateway_key(&["s-openai"]))
        .add_setting(openai_setting("s-openai", "sk-upstream"));

    let mut req = bearer_request(OPENAI_CHAT);
    let auth = gateway
        .pipeline()
        .authorize_and_validate(&mut req, None, 0.0, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(auth.key.key_id, KEY_ID);
    assert_eq!(auth.selected_setting().unwrap().id, "s-openai");
    assert_eq!(req.header("authorization"), Some("Bearer sk-upstream"));
}

#[tokio::test]
async fn test_settings_filtered_by_provider_path() {
    let gateway = TestGateway::new();
    gateway
        .add_key(gateway_key(&["s-openai", "s-anthropic"]))
        .add_setting(openai_setting("s-openai", "sk-upstream"))
        .add_setting(anthropic_setting("s-anthropic", "sk-ant-upstream"));

    let mut req = api_key_request(ANTHROPIC_MESSAGES);
    let auth = gateway
        .pipeline()
        .authorize_and_validate(&mut req, None, 0.0, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(auth.settings.len(), 1);
    assert_eq!(auth.selected_setting().unwrap().provider, "anthropic");
    assert_eq!(req.header("x-api-key"), Some("sk-ant-upstream"));
}

#[tokio::test]
async fn test_rotation_picks_among_eligible_settings() {
    let gateway = TestGateway::new().with_rotation_picks(vec![1, 0]);
    gateway
        .add_key(gateway_key(&["s-a", "s-b"]).with_rotation(true))
        .add_setting(openai_setting("s-a", "sk-a"))
        .add_setting(openai_setting("s-b", "sk-b"));
    let pipeline = gateway.pipeline();

    let mut first = bearer_request(OPENAI_CHAT);
    pipeline
        .authorize_and_validate(&mut first, None, 0.0, &CancellationToken::new())
        .await
        .unwrap();
    let mut second = bearer_request(OPENAI_CHAT);
    pipeline
        .authorize_and_validate(&mut second, None, 0.0, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first.header("authorization"), Some("Bearer sk-b"));
    assert_eq!(second.header("authorization"), Some("Bearer sk-a"));
}

#[tokio::test]
async fn test_seeded_rotation_spreads_over_all_settings() {
    let gateway = TestGateway::new().with_rotation(Arc::new(SeededRotation::new(7)));
    gateway
        .add_key(gateway_key(&["s-a", "s-b", "s-c"]).with_rotation(true))
        .add_setting(openai_setting("s-a", "sk-a"))
        .add_setting(openai_setting("s-b", "sk-b"))
        .add_setting(openai_setting("s-c", "sk-c"));
    let pipeline = gateway.pipeline();

    let mut seen = BTreeSet::new();
    for _ in 0..200 {
        let mut req = bearer_request(OPENAI_CHAT);
        pipeline
            .authorize_and_validate(&mut req, None, 0.0, &CancellationToken::new())
            .await
            .unwrap();
        seen.insert(req.header("authorization").unwrap_or_default().to_string());
    }

    let expected: BTreeSet<String> = ["Bearer sk-a", "Bearer sk-b", "Bearer sk-c"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_without_rotation_first_linked_setting_is_used() {
    let gateway = TestGateway::new().with_rotation(Arc::new(RandomRotation));
    gateway
        .add_key(gateway_key(&["s-b", "s-a"]))
        .add_setting(openai_setting("s-a", "sk-a"))
        .add_setting(openai_setting("s-b", "sk-b"));
    let pipeline = gateway.pipeline();

    for _ in 0..50 {
        let mut req = bearer_request(OPENAI_CHAT);
        let auth = pipeline
            .authorize_and_validate(&mut req, None, 0.0, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(auth.selected_setting().unwrap().id, "s-b");
        assert_eq!(req.header("authorization"), Some("Bearer sk-b"));
    }
}

#[tokio::test]
async fn test_route_request_keeps_caller_header() {
    let gateway = TestGateway::new();
    gateway
        .add_key(gateway_key(&["s-openai", "s-anthropic"]))
        .add_setting(openai_setting("s-openai", "sk-upstream"))
        .add_setting(anthropic_setting("s-anthropic", "sk-ant-upstream"))
        .add_route(
            Route::new("/chain")
                .allow_key(KEY_ID)
                .step("openai", "gpt-4o")
                .step("anthropic", "claude-3-haiku"),
        );

    let mut req = bearer_request("/api/routes/chain");
    let auth = gateway
        .pipeline()
        .authorize_and_validate(&mut req, None, 0.0, &CancellationToken::new())
        .await
        .unwrap();

    let providers: Vec<&str> = auth.settings.iter().map(|s| s.provider.as_str()).collect();
    assert_eq!(providers, vec!["openai", "anthropic"]);
    assert_eq!(req.header("authorization"), Some(format!("Bearer {RAW_KEY}").as_str()));
}

#[tokio::test]
async fn test_route_rejects_key_not_allowed() {
    let gateway = TestGateway::new();
    gateway
        .add_key(gateway_key(&["s-openai"]))
        .add_setting(openai_setting("s-openai", "sk-upstream"))
        .add_route(Route::new("/chain").allow_key("someone-else").step("openai", "gpt-4o"));

    let mut req = bearer_request("/api/routes/chain");
    let err = gateway
        .pipeline()
        .authorize_and_validate(&mut req, None, 0.0, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_status(&err, 401);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let gateway = TestGateway::new();
    gateway.add_key(gateway_key(&[]));

    let mut req = bearer_request("/api/routes/missing");
    let err = gateway
        .pipeline()
        .authorize_and_validate(&mut req, None, 0.0, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_status(&err, 404);
}

#[tokio::test]
async fn test_unknown_key_does_not_leak_secret() {
    let gateway = TestGateway::new();

    let mut req = bearer_request(OPENAI_CHAT);
    let err = gateway
        .pipeline()
        .authorize_and_validate(&mut req, None, 0.0, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_status(&err, 401);
    let message = err.to_string();
    assert!(message.contains("gw-li"));
    assert!(!message.contains(RAW_KEY));
}

#[tokio::test]
async fn test_missing_credential_is_rejected() {
    let gateway = TestGateway::new();

    let mut req = gateway_core::InboundRequest::new(OPENAI_CHAT);
    let err = gateway
        .pipeline()
        .authorize_and_validate(&mut req, None, 0.0, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_status(&err, 401);
}

#[tokio::test]
async fn test_revoked_key_is_rejected() {
    let gateway = TestGateway::new();
    gateway
        .add_key(gateway_key(&["s-openai"]).with_revoked(true))
        .add_setting(openai_setting("s-openai", "sk-upstream"));

    let mut req = bearer_request(OPENAI_CHAT);
    let err = gateway
        .pipeline()
        .authorize_and_validate(&mut req, None, 0.0, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Auth(_)));
    assert!(err.to_string().contains("revoked"));
}

#[tokio::test]
async fn test_exhausted_key_is_rejected_after_authentication() {
    let gateway = TestGateway::new();
    gateway
        .add_key(gateway_key(&["s-openai"]).with_requests_limit(3))
        .add_setting(openai_setting("s-openai", "sk-upstream"));
    gateway.requests.set(KEY_ID, 3);

    let mut req = bearer_request(OPENAI_CHAT);
    let err = gateway
        .pipeline()
        .authorize_and_validate(&mut req, None, 0.0, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GatewayError::Expiration {
            kind: ExpirationKind::RequestsLimitExpiration,
            ..
        }
    ));
    assert_status(&err, 429);
    assert_eq!(
        req.header("authorization"),
        Some(format!("Bearer {RAW_KEY}").as_str())
    );
}

#[tokio::test]
async fn test_cancelled_request_stops_pipeline() {
    let gateway = TestGateway::new();
    gateway
        .add_key(gateway_key(&["s-openai"]))
        .add_setting(openai_setting("s-openai", "sk-upstream"));

    let token = CancellationToken::new();
    token.cancel();

    let mut req = bearer_request(OPENAI_CHAT);
    let err = gateway
        .pipeline()
        .authorize_and_validate(&mut req, None, 0.0, &token)
        .await
        .unwrap_err();

    assert_eq!(err, GatewayError::Cancelled);
    assert_eq!(req.header("authorization"), Some(format!("Bearer {RAW_KEY}").as_str()));
}
