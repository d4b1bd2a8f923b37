//! Outbound credential header rewrite.

use gateway_core::provider::auth_header_for_path;
use gateway_core::{AuthHeader, GatewayError, GatewayResult, InboundRequest, ProviderSetting};

/// Replace the caller's gateway credential with the setting's upstream key.
///
/// The header used depends on the request path namespace. vLLM paths only
/// get a bearer header when a key is configured; everywhere else an empty
/// key is an error unless the setting's provider tolerates it.
///
/// # Errors
/// Returns a validation error when the key is empty and not tolerated.
pub fn rewrite_auth_header(req: &mut InboundRequest, setting: &ProviderSetting) -> GatewayResult<()> {
    let api_key = setting.api_key();

    match auth_header_for_path(req.path()) {
        AuthHeader::OptionalBearer => {
            if !api_key.is_empty() {
                req.set_header("authorization", &format!("Bearer {api_key}"))?;
            }
            Ok(())
        }
        _ if api_key.is_empty() => {
            if setting.kind().allows_empty_api_key() {
                Ok(())
            } else {
                Err(GatewayError::validation("api key is empty in provider setting"))
            }
        }
        AuthHeader::Named(name) => req.set_header(name, api_key),
        AuthHeader::Bearer => req.set_header("authorization", &format!("Bearer {api_key}")),
    }
}
