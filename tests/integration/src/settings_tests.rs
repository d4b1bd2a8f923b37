//! Provider-setting management, encryption at rest and custom providers

use std::collections::BTreeMap;
use std::sync::Arc;

use gateway_core::{CustomProvider, GatewayError, InboundRequest, ProviderSetting, ProviderSettingStore};
use gateway_security::AuthTemplate;
use pretty_assertions::assert_eq;

use crate::fixtures::*;
use crate::helpers::*;

const OPENAI_CHAT: &str = "/api/providers/openai/v1/chat/completions";

#[tokio::test]
async fn test_encrypted_secret_is_decrypted_for_dispatch() {
    let gateway = TestGateway::encrypted();
    let manager = gateway.manager();

    let created = manager
        .create_setting(openai_setting("s-openai", "sk-plain"))
        .await
        .unwrap();
    assert_ne!(created.api_key(), "sk-plain");
    assert!(!created.api_key().is_empty());

    gateway.add_key(gateway_key(&["s-openai"]));
    let authenticator = gateway.authenticator_with(Arc::new(manager));

    let mut req = bearer_request(OPENAI_CHAT);
    let auth = authenticator.authenticate(&mut req, None).await.unwrap();

    assert_eq!(auth.selected_setting().unwrap().api_key(), "sk-plain");
    assert_eq!(req.header("authorization"), Some("Bearer sk-plain"));
}

#[tokio::test]
async fn test_undecryptable_secret_is_used_as_stored() {
    let gateway = TestGateway::encrypted();
    gateway
        .add_key(gateway_key(&["s-openai"]))
        .add_setting(openai_setting("s-openai", "sk-never-encrypted"));

    let mut req = bearer_request(OPENAI_CHAT);
    gateway.authenticator().authenticate(&mut req, None).await.unwrap();

    assert_eq!(req.header("authorization"), Some("Bearer sk-never-encrypted"));
}

#[tokio::test]
async fn test_update_invalidates_cached_setting() {
    let gateway = TestGateway::encrypted();
    let manager = gateway.manager();
    manager
        .create_setting(openai_setting("s-openai", "sk-old"))
        .await
        .unwrap();

    // Warm the cache
    assert!(manager.get_setting_via_cache("s-openai").await.unwrap().is_some());

    let mut params = BTreeMap::new();
    params.insert("apikey".to_string(), "sk-new".to_string());
    manager
        .update_setting("s-openai", Some("rotated".to_string()), params, None)
        .await
        .unwrap();

    let cached = manager.get_setting_via_cache("s-openai").await.unwrap().unwrap();
    assert_eq!(cached.name, "rotated");

    gateway.add_key(gateway_key(&["s-openai"]));
    let mut req = bearer_request(OPENAI_CHAT);
    gateway
        .authenticator_with(Arc::new(manager))
        .authenticate(&mut req, None)
        .await
        .unwrap();
    assert_eq!(req.header("authorization"), Some("Bearer sk-new"));
}

#[tokio::test]
async fn test_rename_keeps_encrypted_secret_usable() {
    let gateway = TestGateway::encrypted();
    let manager = gateway.manager();
    manager
        .create_setting(openai_setting("s-openai", "sk-plain"))
        .await
        .unwrap();

    manager
        .update_setting("s-openai", Some("renamed".to_string()), BTreeMap::new(), None)
        .await
        .unwrap();

    gateway.add_key(gateway_key(&["s-openai"]));
    let mut req = bearer_request(OPENAI_CHAT);
    let auth = gateway
        .authenticator_with(Arc::new(manager))
        .authenticate(&mut req, None)
        .await
        .unwrap();

    assert_eq!(auth.selected_setting().unwrap().name, "renamed");
    assert_eq!(req.header("authorization"), Some("Bearer sk-plain"));
}

#[tokio::test]
async fn test_incomplete_params_are_rejected() {
    let gateway = TestGateway::new();
    let err = gateway
        .manager()
        .create_setting(ProviderSetting::new("s-azure", "azure").with_param("apikey", "az"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        GatewayError::validation("provider azure is missing fields resourceName")
    );
}

#[tokio::test]
async fn test_unregistered_custom_provider_is_rejected() {
    let gateway = TestGateway::new();
    let err = gateway
        .manager()
        .create_setting(ProviderSetting::new("c1", "my-llm").with_param("apikey", "up"))
        .await
        .unwrap_err();

    assert_eq!(err, GatewayError::validation("provider my-llm is not supported"));
}

#[tokio::test]
async fn test_custom_provider_header_template_flow() {
    let gateway = TestGateway::new();
    gateway.settings.register_custom_provider(CustomProvider {
        provider: "my-llm".to_string(),
        authentication_param: "apikey".to_string(),
    });
    gateway.add_key(gateway_key(&[]));

    let manager = gateway.manager();
    let created = manager
        .create_setting(
            ProviderSetting::new("c1", "my-llm")
                .with_param("apikey", "upstream")
                .with_param("authLocation", "header")
                .with_param("authTemplate", "X-Auth:Token {{apikey}}"),
        )
        .await
        .unwrap();

    let template = AuthTemplate::from_setting(&created).unwrap();
    assert_eq!(template.target(), "X-Auth");
    assert_eq!(template.mask(), "Token {{apikey}}");

    let mut req = InboundRequest::new("/api/providers/xCustom/c1/v1/generate")
        .with_header("X-Auth", &format!("Token {RAW_KEY}"))
        .unwrap();
    let auth = gateway
        .authenticator_with(Arc::new(manager))
        .authenticate(&mut req, Some("c1"))
        .await
        .unwrap();

    assert_eq!(auth.key.key_id, KEY_ID);
    assert_eq!(req.header("X-Auth"), Some("Token upstream"));
}

#[tokio::test]
async fn test_custom_provider_query_template_flow() {
    let gateway = TestGateway::new();
    gateway.add_key(gateway_key(&[]));

    let mut setting = ProviderSetting::new("c2", "my-llm").with_param("apikey", "upstream");
    AuthTemplate::parse("query", "key={{apikey}}")
        .unwrap()
        .apply_to(&mut setting);
    gateway.settings.create_setting(setting).await.unwrap();

    let mut req = InboundRequest::new("/api/providers/xCustom/c2/v1/generate")
        .with_query("key", RAW_KEY);
    gateway
        .authenticator()
        .authenticate(&mut req, Some("c2"))
        .await
        .unwrap();

    assert_eq!(req.query_param("key"), Some("upstream"));
}

#[tokio::test]
async fn test_custom_provider_unknown_setting() {
    let gateway = TestGateway::new();
    gateway.add_key(gateway_key(&[]));

    let mut req = InboundRequest::new("/api/providers/xCustom/c9/v1/generate")
        .with_header("X-Auth", &format!("Token {RAW_KEY}"))
        .unwrap();
    let err = gateway
        .authenticator()
        .authenticate(&mut req, Some("c9"))
        .await
        .unwrap_err();

    assert_status(&err, 404);
}
