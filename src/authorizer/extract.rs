//! Credential classification from raw request descriptions

use crate::config::PdpConfig;
use crate::error::{PdpError, Result};
use super::types::{AuthorizerRequest, Credential, CredentialKind};

/// Authorization mode flag value for token-based requests
pub const TOKEN_MODE: &str = "TOKEN";

/// Classifies an inbound request into a typed credential
#[derive(Debug, Clone)]
pub struct TokenExtractor {
    api_key_header: String,
    api_key_min_length: usize,
    bypass_path: String,
}

impl TokenExtractor {
    pub fn new(
        api_key_header: impl Into<String>,
        api_key_min_length: usize,
        bypass_path: impl Into<String>,
    ) -> Self {
        Self {
            api_key_header: api_key_header.into(),
            api_key_min_length,
            bypass_path: bypass_path.into(),
        }
    }

    pub fn from_config(config: &PdpConfig) -> Self {
        Self::new(
            config.api_key_header.clone(),
            config.api_key_min_length,
            config.bypass_path.clone(),
        )
    }

    /// Extract the credential a request presents
    ///
    /// An API key header wins over every other scheme. Otherwise the request
    /// must be in token mode (unless it targets the bypass path) and carry a
    /// `<scheme> <value>` token.
    pub fn extract(&self, request: &AuthorizerRequest) -> Result<Credential> {
        if let Some(api_key) = request.header(&self.api_key_header) {
            let api_key = api_key.trim();
            if api_key.chars().count() < self.api_key_min_length {
                return Err(PdpError::MalformedCredential(format!(
                    "API key shorter than {} characters",
                    self.api_key_min_length
                )));
            }
            tracing::debug!("Classified request credential as API key");
            return Credential::new(CredentialKind::ApiKey, api_key);
        }

        let bypass = request.resource.as_deref() == Some(self.bypass_path.as_str());
        if !bypass && request.auth_type.as_deref() != Some(TOKEN_MODE) {
            return Err(PdpError::MalformedCredential(format!(
                "Expected request type to be {}",
                TOKEN_MODE
            )));
        }

        let raw = request
            .authorization_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .or_else(|| request.header("Authorization"))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                PdpError::MalformedCredential(
                    "Expected authorizationToken or Authorization header to be set".to_string(),
                )
            })?;

        let (kind, value) = split_scheme(raw)
            .ok_or_else(|| PdpError::MalformedCredential(describe_unrecognized(raw)))?;

        tracing::debug!("Classified request credential as {}", kind);
        Credential::new(kind, value)
    }
}

/// Error detail for an unusable `Authorization` value; never echoes the credential
fn describe_unrecognized(raw: &str) -> String {
    match raw.split_once(char::is_whitespace) {
        Some((scheme, _)) if scheme.len() <= 16 && scheme.chars().all(|c| c.is_ascii_alphabetic()) => {
            format!("Unsupported Authorization scheme {} ({} chars)", scheme, raw.len())
        }
        _ => format!("Invalid Authorization token ({} chars)", raw.len()),
    }
}

/// Split `<scheme> <value>` into a recognized scheme and its non-empty value
pub fn split_scheme(raw: &str) -> Option<(CredentialKind, &str)> {
    let (scheme, value) = raw.split_once(char::is_whitespace)?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let kind = if scheme.eq_ignore_ascii_case("Bearer") {
        CredentialKind::Bearer
    } else if scheme.eq_ignore_ascii_case("Basic") {
        CredentialKind::Basic
    } else {
        return None;
    };

    Some((kind, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> TokenExtractor {
        TokenExtractor::new("x-api-key", 16, "/authorize")
    }

    fn token_request(token: &str) -> AuthorizerRequest {
        AuthorizerRequest {
            auth_type: Some("TOKEN".to_string()),
            authorization_token: Some(token.to_string()),
            method_arn: "arn:aws:execute-api:eu-west-1:123456789012:abc123/dev/GET/messages".to_string(),
            ..AuthorizerRequest::default()
        }
    }

    #[test]
    fn test_bearer_token() {
        let credential = extractor().extract(&token_request("Bearer abc.def.ghi")).unwrap();
        assert_eq!(credential.kind(), CredentialKind::Bearer);
        assert_eq!(credential.value(), "abc.def.ghi");
    }

    #[test]
    fn test_basic_token() {
        let credential = extractor().extract(&token_request("Basic dXNlcjpwdw==")).unwrap();
        assert_eq!(credential.kind(), CredentialKind::Basic);
        assert_eq!(credential.value(), "dXNlcjpwdw==");
    }

    #[test]
    fn test_value_case_is_preserved() {
        let credential = extractor().extract(&token_request("bearer AbC.DeF.GhI")).unwrap();
        assert_eq!(credential.kind(), CredentialKind::Bearer);
        assert_eq!(credential.value(), "AbC.DeF.GhI");
    }

    #[test]
    fn test_api_key_short_circuits_token_mode() {
        let mut request = AuthorizerRequest::default();
        request.headers.insert("X-API-Key".to_string(), "0123456789abcdef".to_string());
        request.authorization_token = Some("Bearer ignored".to_string());

        let credential = extractor().extract(&request).unwrap();
        assert_eq!(credential.kind(), CredentialKind::ApiKey);
        assert_eq!(credential.value(), "0123456789abcdef");
    }

    #[test]
    fn test_api_key_too_short() {
        let mut request = token_request("Bearer abc");
        request.headers.insert("x-api-key".to_string(), "short".to_string());
        let err = extractor().extract(&request).unwrap_err();
        assert!(matches!(err, PdpError::MalformedCredential(_)));
    }

    #[test]
    fn test_missing_token_mode() {
        let mut request = token_request("Bearer abc.def.ghi");
        request.auth_type = Some("REQUEST".to_string());
        assert!(extractor().extract(&request).is_err());

        request.auth_type = None;
        assert!(extractor().extract(&request).is_err());
    }

    #[test]
    fn test_bypass_path_skips_token_mode() {
        let mut request = token_request("Bearer abc.def.ghi");
        request.auth_type = None;
        request.resource = Some("/authorize".to_string());
        let credential = extractor().extract(&request).unwrap();
        assert_eq!(credential.kind(), CredentialKind::Bearer);
    }

    #[test]
    fn test_authorization_header_fallback() {
        let mut request = token_request("");
        request.authorization_token = None;
        request.headers.insert("authorization".to_string(), "Basic dXNlcjpwdw==".to_string());
        let credential = extractor().extract(&request).unwrap();
        assert_eq!(credential.kind(), CredentialKind::Basic);
    }

    #[test]
    fn test_missing_token() {
        let mut request = token_request("");
        request.authorization_token = None;
        let err = extractor().extract(&request).unwrap_err();
        assert!(err.to_string().contains("authorizationToken"));
    }

    #[test]
    fn test_unrecognized_value_is_not_echoed() {
        let err = extractor().extract(&token_request("Digest s3cr3t-response")).unwrap_err();
        assert!(matches!(err, PdpError::MalformedCredential(_)));
        assert!(err.to_string().contains("Digest"));
        assert!(!err.to_string().contains("s3cr3t"));

        let err = extractor().extract(&token_request("s3cr3t-without-scheme")).unwrap_err();
        assert!(!err.to_string().contains("s3cr3t"));

        let err = extractor().extract(&token_request("Bearer")).unwrap_err();
        assert!(err.to_string().contains("6 chars"));
    }

    #[test]
    fn test_split_scheme_edge_cases() {
        assert_eq!(split_scheme("Bearer"), None);
        assert_eq!(split_scheme("Bearer   "), None);
        assert_eq!(split_scheme("Bearertoken"), None);
        assert_eq!(split_scheme("Bearer  token"), Some((CredentialKind::Bearer, "token")));
        assert_eq!(split_scheme("BASIC\tabc"), Some((CredentialKind::Basic, "abc")));
    }
}
