//! Limit validation ordering and thresholds

use gateway_core::{ExpirationKind, GatewayError, TimeUnit};
use pretty_assertions::assert_eq;

use crate::fixtures::*;
use crate::helpers::*;

fn expiration_kind(err: &GatewayError) -> Option<ExpirationKind> {
    match err {
        GatewayError::Expiration { kind, .. } => Some(*kind),
        _ => None,
    }
}

#[tokio::test]
async fn test_missing_key() {
    let gateway = TestGateway::new();
    let err = gateway.validator().validate(None, 0.0).await.unwrap_err();
    assert_eq!(err, GatewayError::validation("empty api key"));
}

#[tokio::test]
async fn test_revocation_checked_before_counters() {
    let gateway = TestGateway::new();
    let key = gateway_key(&[]).with_revoked(true).with_requests_limit(1);
    gateway.requests.set(KEY_ID, 10);

    let err = gateway.validator().validate(Some(&key), 0.0).await.unwrap_err();
    assert_eq!(err, GatewayError::validation("api key revoked"));
}

#[tokio::test]
async fn test_ttl_expires_at_boundary() {
    let gateway = TestGateway::new();
    let key = gateway_key(&[]).with_ttl("1h");
    let validator = gateway.validator();

    gateway.clock.advance(3599);
    assert!(validator.validate(Some(&key), 0.0).await.is_ok());

    gateway.clock.advance(1);
    let err = validator.validate(Some(&key), 0.0).await.unwrap_err();
    assert_eq!(expiration_kind(&err), Some(ExpirationKind::TtlExpiration));
}

#[tokio::test]
async fn test_unparseable_ttl_never_expires() {
    let gateway = TestGateway::new();
    let key = gateway_key(&[]).with_ttl("forever");

    gateway.clock.advance(10 * 365 * 24 * 3600);
    assert!(gateway.validator().validate(Some(&key), 0.0).await.is_ok());
}

#[tokio::test]
async fn test_ttl_accepts_only_go_durations() {
    let gateway = TestGateway::new();
    let validator = gateway.validator();
    gateway.clock.advance(2 * 24 * 3600);

    for ttl in ["1d", "10 s", "48", "500ms"] {
        let key = gateway_key(&[]).with_ttl(ttl);
        assert!(validator.validate(Some(&key), 0.0).await.is_ok(), "{ttl}");
    }
    for ttl in ["-10s", "1h30m", "1.5h"] {
        let key = gateway_key(&[]).with_ttl(ttl);
        let err = validator.validate(Some(&key), 0.0).await.unwrap_err();
        assert_eq!(expiration_kind(&err), Some(ExpirationKind::TtlExpiration), "{ttl}");
    }
}

#[tokio::test]
async fn test_requests_limit_checked_before_rate() {
    let gateway = TestGateway::new();
    let key = gateway_key(&[])
        .with_requests_limit(10)
        .with_rate_limit(1, TimeUnit::Minute);
    gateway.requests.set(KEY_ID, 10);
    gateway.rate.set_windowed(KEY_ID, TimeUnit::Minute, 5);

    let err = gateway.validator().validate(Some(&key), 0.0).await.unwrap_err();
    assert_eq!(
        expiration_kind(&err),
        Some(ExpirationKind::RequestsLimitExpiration)
    );
}

#[tokio::test]
async fn test_rate_limit_per_window() {
    let gateway = TestGateway::new();
    let key = gateway_key(&[]).with_rate_limit(5, TimeUnit::Minute);
    let validator = gateway.validator();

    gateway.rate.set_windowed(KEY_ID, TimeUnit::Minute, 4);
    assert!(validator.validate(Some(&key), 0.0).await.is_ok());

    gateway.rate.add_windowed(KEY_ID, TimeUnit::Minute, 1);
    let err = validator.validate(Some(&key), 0.0).await.unwrap_err();
    assert!(matches!(err, GatewayError::RateLimit(_)));
    assert_status(&err, 429);
}

#[tokio::test]
async fn test_cost_limit_over_time_checked_before_lifetime_cost() {
    let gateway = TestGateway::new();
    let key = gateway_key(&[])
        .with_cost_limit_over_time(1.0, TimeUnit::Day)
        .with_cost_limit(2.0);
    gateway.cost_window.set_windowed(KEY_ID, TimeUnit::Day, 1_000_000);
    gateway.cost_total.set(KEY_ID, 2_000_000);

    let err = gateway.validator().validate(Some(&key), 0.0).await.unwrap_err();
    assert!(matches!(err, GatewayError::CostLimit(_)));
}

#[tokio::test]
async fn test_lifetime_cost_limit() {
    let gateway = TestGateway::new();
    let key = gateway_key(&[]).with_cost_limit(2.0);
    let validator = gateway.validator();

    gateway.cost_total.set(KEY_ID, 1_999_999);
    assert!(validator.validate(Some(&key), 0.0).await.is_ok());

    gateway.cost_total.add(KEY_ID, 1);
    let err = validator.validate(Some(&key), 0.0).await.unwrap_err();
    assert_eq!(expiration_kind(&err), Some(ExpirationKind::CostLimitExpiration));
}

#[tokio::test]
async fn test_zero_limits_are_unlimited() {
    let gateway = TestGateway::new();
    let key = gateway_key(&[]);
    gateway.requests.set(KEY_ID, 1_000_000);
    gateway.cost_total.set(KEY_ID, 1_000_000_000);

    assert!(gateway.validator().validate(Some(&key), 0.0).await.is_ok());
}

#[tokio::test]
async fn test_is_spent() {
    let gateway = TestGateway::new();
    let key = gateway_key(&[]).with_requests_limit(2);
    let validator = gateway.validator();

    gateway.requests.set(KEY_ID, 1);
    assert!(!validator.is_spent(&key).await);

    gateway.requests.add(KEY_ID, 1);
    assert!(validator.is_spent(&key).await);
}
