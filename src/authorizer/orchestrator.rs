//! The authorization operation the gateway calls

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use subtle::ConstantTimeEq;
use tokio::time::Instant;

use crate::config::{PdpConfig, DEFAULT_KEY_FETCH_TIMEOUT_SECS};
use crate::error::{PdpError, Result};
use super::decision::{build_decision, MethodArn, PolicyResponse};
use super::extract::TokenExtractor;
use super::keys::{HttpKeySetSource, KeyCache, KeyResolver, KeySetSource};
use super::scope::ScopeResolver;
use super::types::{AccessDecision, AuthorizerRequest, Credential, CredentialKind, PermissionTier};
use super::verify::{inspect, SignatureVerifier};

/// Principal reported for requests authenticated by API key
pub const API_KEY_PRINCIPAL: &str = "api-key";

/// Signed token verification pieces, present when `[oauth]` is configured
#[derive(Clone)]
struct BearerVerification {
    resolver: KeyResolver,
    verifier: SignatureVerifier,
}

/// Authorization decision engine
///
/// Holds no per-request state; one instance serves concurrent requests.
/// The only shared mutable state is the injected [`KeyCache`].
#[derive(Clone)]
pub struct Authorizer {
    api_key: Option<String>,
    extractor: TokenExtractor,
    bearer: Option<BearerVerification>,
    scopes: ScopeResolver,
    key_fetch_timeout: Duration,
}

impl Authorizer {
    /// Create an authorizer fetching keys from the configured JWKS endpoint
    pub fn new(config: &PdpConfig, cache: KeyCache) -> Result<Self> {
        let source: Option<Arc<dyn KeySetSource>> = config
            .oauth
            .as_ref()
            .map(|oauth| Arc::new(HttpKeySetSource::new(oauth.jwks_uri.clone())) as Arc<dyn KeySetSource>);
        Self::build(config, cache, source)
    }

    /// Create an authorizer with an explicit key set source
    pub fn with_source(config: &PdpConfig, cache: KeyCache, source: Arc<dyn KeySetSource>) -> Result<Self> {
        Self::build(config, cache, Some(source))
    }

    fn build(config: &PdpConfig, cache: KeyCache, source: Option<Arc<dyn KeySetSource>>) -> Result<Self> {
        config.validate()?;

        let bearer = match (&config.oauth, source) {
            (Some(oauth), Some(source)) => Some(BearerVerification {
                resolver: KeyResolver::new(cache, source),
                verifier: SignatureVerifier::new(oauth.expectations()),
            }),
            _ => None,
        };

        Ok(Self {
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            extractor: TokenExtractor::from_config(config),
            bearer,
            scopes: ScopeResolver::new(config.scopes.clone()),
            key_fetch_timeout: config
                .oauth
                .as_ref()
                .map(|oauth| oauth.key_fetch_timeout())
                .unwrap_or(Duration::from_secs(DEFAULT_KEY_FETCH_TIMEOUT_SECS)),
        })
    }

    /// Authorize a request, bounding key fetches by the configured timeout
    pub async fn authorize(&self, request: &AuthorizerRequest) -> Result<AccessDecision> {
        self.authorize_with_deadline(request, Instant::now() + self.key_fetch_timeout)
            .await
    }

    /// Authorize a request within the caller's deadline
    ///
    /// Every failure is logged with its kind and surfaced as
    /// [`PdpError::Unauthorized`].
    pub async fn authorize_with_deadline(
        &self,
        request: &AuthorizerRequest,
        deadline: Instant,
    ) -> Result<AccessDecision> {
        match self.decide(request, deadline).await {
            Ok(decision) => {
                tracing::info!(
                    principal = %decision.principal_id,
                    effect = %decision.effect,
                    resource = %decision.resource,
                    "Authorization decision built"
                );
                Ok(decision)
            }
            Err(err) => {
                tracing::warn!(kind = err.kind(), error = %err, "User not authorized");
                Err(PdpError::Unauthorized)
            }
        }
    }

    /// Authorize and render the gateway policy
    pub async fn authorize_policy(&self, request: &AuthorizerRequest) -> Result<PolicyResponse> {
        Ok(self.authorize(request).await?.to_policy())
    }

    async fn decide(&self, request: &AuthorizerRequest, deadline: Instant) -> Result<AccessDecision> {
        let credential = self.extractor.extract(request)?;
        let method_arn = MethodArn::parse(&request.method_arn)?;

        let decision = match credential.kind() {
            CredentialKind::ApiKey => {
                self.check_api_key(&credential)?;
                tracing::debug!("API key matched");
                build_decision(API_KEY_PRINCIPAL, Some(PermissionTier::Write), &method_arn)
            }
            CredentialKind::Basic => {
                let username = self.check_basic(&credential)?;
                tracing::debug!(principal = %username, "Basic credentials matched");
                build_decision(&username, Some(PermissionTier::Write), &method_arn)
            }
            CredentialKind::Bearer => self.check_bearer(&credential, &method_arn, deadline).await?,
        };

        Ok(decision.with_context("scheme", credential.kind().to_string()))
    }

    fn server_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| PdpError::CredentialMismatch("API key missing in the server configuration".to_string()))
    }

    fn check_api_key(&self, credential: &Credential) -> Result<()> {
        let server_key = self.server_key()?;
        if constant_time_eq(credential.value(), server_key) {
            Ok(())
        } else {
            Err(PdpError::CredentialMismatch("API key from request does not match".to_string()))
        }
    }

    /// Returns the username when the password matches the server key
    fn check_basic(&self, credential: &Credential) -> Result<String> {
        let server_key = self.server_key()?;

        let decoded = STANDARD
            .decode(credential.value())
            .map_err(|_| PdpError::MalformedCredential("Basic credentials are not base64".to_string()))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| PdpError::MalformedCredential("Basic credentials are not UTF-8".to_string()))?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or_else(|| PdpError::MalformedCredential("Basic credentials missing ':' separator".to_string()))?;
        if username.is_empty() {
            return Err(PdpError::MalformedCredential("Basic credentials missing username".to_string()));
        }

        if constant_time_eq(password, server_key) {
            Ok(username.to_string())
        } else {
            Err(PdpError::CredentialMismatch("Basic password does not match".to_string()))
        }
    }

    async fn check_bearer(
        &self,
        credential: &Credential,
        method_arn: &MethodArn,
        deadline: Instant,
    ) -> Result<AccessDecision> {
        let bearer = self
            .bearer
            .as_ref()
            .ok_or_else(|| PdpError::Config("Bearer tokens not accepted: no [oauth] section".to_string()))?;

        let unverified = inspect(credential.value())?;
        tracing::debug!(kid = %unverified.key_id, "Decoded token header");

        let key = bearer.resolver.resolve(&unverified.key_id, deadline).await?;
        let token = bearer.verifier.verify(credential.value(), &key)?;
        tracing::debug!(kid = %token.key_id, sub = %token.claims.sub, "Token signature verified");

        let resolved = self.scopes.resolve(&token.claims)?;
        tracing::debug!(tier = ?resolved.tier, scope = ?resolved.scope, "Resolved permission tier");

        let mut decision = build_decision(&token.claims.sub, Some(resolved.tier), method_arn);
        let issuer = bearer
            .verifier
            .expectations()
            .issuer
            .clone()
            .or_else(|| token.claims.iss.clone());
        if let Some(issuer) = issuer {
            decision = decision.with_context("issuer", issuer);
        }
        if let Some(scope) = resolved.scope {
            decision = decision.with_context("scope", scope);
        }
        Ok(decision)
    }
}

fn constant_time_eq(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
