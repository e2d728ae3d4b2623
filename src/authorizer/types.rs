//! Common types for authorization decisions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{PdpError, Result};

/// Inbound request description, as delivered by the gateway's custom authorizer event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerRequest {
    /// Authorization mode flag ("TOKEN" for token-based authorization)
    #[serde(rename = "type", default)]
    pub auth_type: Option<String>,
    /// Explicit authorization token field
    #[serde(default)]
    pub authorization_token: Option<String>,
    /// Request headers
    #[serde(default, deserialize_with = "null_as_empty")]
    pub headers: HashMap<String, String>,
    /// Requested resource path
    #[serde(default)]
    pub resource: Option<String>,
    /// Method descriptor: `arn:<partition>:execute-api:<region>:<account>:<api>/<stage>/<method>/<path>`
    pub method_arn: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<HashMap<String, String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl AuthorizerRequest {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Authentication scheme a credential was presented under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialKind {
    Bearer,
    Basic,
    ApiKey,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialKind::Bearer => f.write_str("Bearer"),
            CredentialKind::Basic => f.write_str("Basic"),
            CredentialKind::ApiKey => f.write_str("ApiKey"),
        }
    }
}

/// Raw authentication material extracted from a request, tagged with its scheme
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    value: String,
    kind: CredentialKind,
}

impl Credential {
    /// Create a credential; the value must be non-empty
    pub fn new(kind: CredentialKind, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(PdpError::MalformedCredential(format!("{} credential is empty", kind)));
        }
        Ok(Self { value, kind })
    }

    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

// Never print credential material.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Audience claim, which may be a single string or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

/// Claims carried by a signed token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (caller identity)
    #[serde(default)]
    pub sub: String,
    /// Issuer
    #[serde(default)]
    pub iss: Option<String>,
    /// Audience
    #[serde(default)]
    pub aud: Option<Audience>,
    /// Expiration time; NumericDate may carry a fraction
    #[serde(default)]
    pub exp: Option<f64>,
    /// Issued at time
    #[serde(default)]
    pub iat: Option<f64>,
    /// Additional claims, scopes among them
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// A verified signed token
#[derive(Debug, Clone)]
pub struct DecodedToken {
    /// Key identifier from the token header
    pub key_id: String,
    /// Verified claims
    pub claims: TokenClaims,
}

/// Public key material used to verify token signatures
#[derive(Clone)]
pub struct VerificationKey {
    pub key_id: String,
    pub algorithm: jsonwebtoken::Algorithm,
    pub decoding_key: jsonwebtoken::DecodingKey,
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Coarse-grained capability level derived from scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionTier {
    Read,
    Write,
}

/// Scope resolution outcome: the tier and the scope literal that fixed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScope {
    pub tier: PermissionTier,
    /// Matched literal, `None` when the tier came from the configured default
    pub scope: Option<String>,
}

/// Policy statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Allow => f.write_str("Allow"),
            Effect::Deny => f.write_str("Deny"),
        }
    }
}

/// Scoped access decision returned to the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub principal_id: String,
    pub effect: Effect,
    pub resource: String,
    pub context: BTreeMap<String, String>,
}
