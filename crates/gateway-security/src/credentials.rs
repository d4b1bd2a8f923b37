//! Caller credential extraction for native provider paths.

use gateway_core::{GatewayError, GatewayResult, InboundRequest};

/// Headers consulted before `Authorization`, in order.
pub const API_KEY_HEADERS: &[&str] = &["x-api-key", "api-key"];

/// Extract the caller's gateway key.
///
/// `x-api-key` wins over `api-key`, which wins over the second
/// space-separated token of `Authorization`. Empty values are skipped.
///
/// # Errors
/// Returns an auth error when no header yields a key.
pub fn extract_api_key(req: &InboundRequest) -> GatewayResult<String> {
    for name in API_KEY_HEADERS {
        if let Some(value) = req.header(name).filter(|v| !v.is_empty()) {
            return Ok(value.to_string());
        }
    }

    req.header("authorization")
        .and_then(|value| value.split(' ').nth(1))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| GatewayError::auth("api key not found in header"))
}
