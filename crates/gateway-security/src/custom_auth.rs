//! Custom-provider auth templates.
//!
//! A custom provider describes where its secret lives with a location
//! (`header` or `query`) and a template such as `Authorization:Bearer {{apikey}}`
//! or `key={{apikey}}`. At setting creation the template is split into a
//! target (`Authorization`) and a mask (`Bearer {{apikey}}`); at request time
//! the mask is used twice: as a pattern to pull the caller's gateway key out
//! of the inbound request, and as a format to write the upstream secret back.

use gateway_core::provider::params;
use gateway_core::{GatewayError, GatewayResult, InboundRequest, ProviderSetting};
use regex::Regex;

use crate::error::{Result, SecurityError};

/// Placeholder substituted with the secret.
pub const API_KEY_PLACEHOLDER: &str = "{{apikey}}";

/// Where the custom provider carries its secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthLocation {
    /// An HTTP header
    Header,
    /// A query parameter
    Query,
}

impl AuthLocation {
    /// Parse a location name.
    ///
    /// # Errors
    /// Returns an error for anything other than `header` or `query`.
    pub fn parse(location: &str) -> Result<Self> {
        match location {
            "header" => Ok(Self::Header),
            "query" => Ok(Self::Query),
            other => Err(SecurityError::UnknownAuthLocation(other.to_string())),
        }
    }

    /// Separator between target and mask in a template.
    #[must_use]
    pub fn separator(self) -> char {
        match self {
            Self::Header => ':',
            Self::Query => '=',
        }
    }

    /// Location name as stored in settings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Query => "query",
        }
    }
}

/// A parsed auth template.
#[derive(Debug, Clone)]
pub struct AuthTemplate {
    location: AuthLocation,
    target: String,
    mask: String,
    pattern: Regex,
}

impl AuthTemplate {
    /// Split a template into target and mask for `location`.
    ///
    /// # Errors
    /// Returns an error for an unknown location or a template that does not
    /// split into exactly two parts.
    pub fn parse(location: &str, template: &str) -> Result<Self> {
        let location = AuthLocation::parse(location)?;
        let parts: Vec<&str> = template.split(location.separator()).collect();
        let [target, mask] = parts.as_slice() else {
            return Err(SecurityError::InvalidTemplate(template.to_string()));
        };
        Self::from_parts(location, target.trim(), mask.trim())
    }

    /// Build from an already-split target and mask.
    ///
    /// # Errors
    /// Returns an error if the mask cannot be turned into a pattern.
    pub fn from_parts(
        location: AuthLocation,
        target: impl Into<String>,
        mask: impl Into<String>,
    ) -> Result<Self> {
        let mask = mask.into();
        let pattern = mask_pattern(&mask)?;
        Ok(Self {
            location,
            target: target.into(),
            mask,
            pattern,
        })
    }

    /// Rebuild the template stored on a custom-provider setting.
    ///
    /// # Errors
    /// Returns a validation error if the stored location is unknown.
    pub fn from_setting(setting: &ProviderSetting) -> GatewayResult<Self> {
        let location = AuthLocation::parse(setting.param(params::AUTH_LOCATION))?;
        Ok(Self::from_parts(
            location,
            setting.param(params::AUTH_TARGET),
            setting.param(params::AUTH_MASK),
        )?)
    }

    /// Location
    #[must_use]
    pub fn location(&self) -> AuthLocation {
        self.location
    }

    /// Header or query parameter name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Mask containing the placeholder.
    #[must_use]
    pub fn mask(&self) -> &str {
        &self.mask
    }

    /// Pull the caller's key out of `req`.
    ///
    /// # Errors
    /// Returns an auth error naming `setting_id` when the mask does not match.
    pub fn extract(&self, req: &InboundRequest, setting_id: &str) -> GatewayResult<String> {
        let raw = match self.location {
            AuthLocation::Header => req.header(&self.target),
            AuthLocation::Query => req.query_param(&self.target),
        }
        .unwrap_or_default();

        self.pattern
            .captures(raw)
            .and_then(|caps| caps.name("key"))
            .map(|m| m.as_str().trim().to_string())
            .ok_or_else(|| GatewayError::auth(format!("error extracting apikey: {setting_id}")))
    }

    /// Fill the mask with `api_key`.
    #[must_use]
    pub fn render(&self, api_key: &str) -> String {
        self.mask.replace(API_KEY_PLACEHOLDER, api_key)
    }

    /// Write the rendered mask to the target header or query parameter.
    ///
    /// # Errors
    /// Returns a validation error if the header cannot be set.
    pub fn inject(&self, req: &mut InboundRequest, api_key: &str) -> GatewayResult<()> {
        let value = self.render(api_key);
        match self.location {
            AuthLocation::Header => req.set_header(&self.target, &value),
            AuthLocation::Query => {
                req.set_query_param(&self.target, value);
                Ok(())
            }
        }
    }

    /// Store the derived target and mask on a setting.
    pub fn apply_to(&self, setting: &mut ProviderSetting) {
        setting
            .setting
            .insert(params::AUTH_LOCATION.to_string(), self.location.as_str().to_string());
        setting
            .setting
            .insert(params::AUTH_TARGET.to_string(), self.target.clone());
        setting
            .setting
            .insert(params::AUTH_MASK.to_string(), self.mask.clone());
    }
}

/// The mask with literal text escaped, the first placeholder capturing `key`
/// and any later placeholder matching anything.
fn mask_pattern(mask: &str) -> Result<Regex> {
    let mut pattern = String::new();
    for (i, literal) in mask.split(API_KEY_PLACEHOLDER).enumerate() {
        match i {
            0 => {}
            1 => pattern.push_str("(?P<key>.*)"),
            _ => pattern.push_str(".*"),
        }
        pattern.push_str(&regex::escape(literal));
    }
    Regex::new(&pattern).map_err(|e| SecurityError::InvalidTemplate(format!("{mask}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_template() {
        let template = AuthTemplate::parse("header", "Authorization: Bearer {{apikey}}").unwrap();
        assert_eq!(template.location(), AuthLocation::Header);
        assert_eq!(template.target(), "Authorization");
        assert_eq!(template.mask(), "Bearer {{apikey}}");
    }

    #[test]
    fn test_parse_query_template() {
        let template = AuthTemplate::parse("query", "key = {{apikey}}").unwrap();
        assert_eq!(template.target(), "key");
        assert_eq!(template.mask(), "{{apikey}}");
    }

    #[test]
    fn test_parse_rejects_bad_templates() {
        assert!(matches!(
            AuthTemplate::parse("header", "Authorization"),
            Err(SecurityError::InvalidTemplate(_))
        ));
        assert!(matches!(
            AuthTemplate::parse("header", "a:b:c"),
            Err(SecurityError::InvalidTemplate(_))
        ));
        assert!(matches!(
            AuthTemplate::parse("cookie", "a=b"),
            Err(SecurityError::UnknownAuthLocation(_))
        ));
    }

    #[test]
    fn test_extract_from_header() {
        let template = AuthTemplate::parse("header", "Authorization:Bearer {{apikey}}").unwrap();
        let req = InboundRequest::new("/api/providers/xCustom/p1/v1")
            .with_header("Authorization", "Bearer  gw-123 ")
            .unwrap();

        assert_eq!(template.extract(&req, "s1").unwrap(), "gw-123");
    }

    #[test]
    fn test_extract_mismatch() {
        let template = AuthTemplate::parse("header", "Authorization:Bearer {{apikey}}").unwrap();
        let req = InboundRequest::new("/api/providers/xCustom/p1/v1")
            .with_header("Authorization", "Token gw-123")
            .unwrap();

        let err = template.extract(&req, "s1").unwrap_err();
        assert_eq!(err, GatewayError::auth("error extracting apikey: s1"));
    }

    #[test]
    fn test_mask_literals_are_escaped() {
        let template = AuthTemplate::parse("header", "X-Key:v1.{{apikey}}").unwrap();
        let ok = InboundRequest::new("/p").with_header("X-Key", "v1.abc").unwrap();
        let bad = InboundRequest::new("/p").with_header("X-Key", "v1xabc").unwrap();

        assert_eq!(template.extract(&ok, "s").unwrap(), "abc");
        assert!(template.extract(&bad, "s").is_err());
    }

    #[test]
    fn test_inject_query() {
        let template = AuthTemplate::parse("query", "key={{apikey}}").unwrap();
        let mut req = InboundRequest::from_uri("/api/providers/xCustom/p1/v1?key=gw-123");

        template.inject(&mut req, "upstream").unwrap();
        assert_eq!(req.query_param("key"), Some("upstream"));
    }

    #[test]
    fn test_from_setting_roundtrip() {
        let mut setting = ProviderSetting::new("s1", "my-llm");
        AuthTemplate::parse("header", "X-Token:{{apikey}}")
            .unwrap()
            .apply_to(&mut setting);

        let template = AuthTemplate::from_setting(&setting).unwrap();
        assert_eq!(template.target(), "X-Token");
        assert_eq!(template.render("abc"), "abc");
    }
}
