//! Signed token verification

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde_json::{Map, Value};

use crate::error::{PdpError, Result};
use super::types::{DecodedToken, TokenClaims, VerificationKey};

/// Claim values a token must carry; `None` skips the check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenExpectations {
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

/// Header facts read from a token before its signature is checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedToken {
    pub key_id: String,
    pub algorithm: Algorithm,
}

/// Structurally decode a token without verifying it
///
/// The header must carry a `kid` and the payload must be a non-empty JSON
/// object. This runs before any key lookup so malformed tokens never cause
/// a key set fetch.
pub fn inspect(token: &str) -> Result<UnverifiedToken> {
    let header = decode_header(token)
        .map_err(|e| PdpError::SignatureInvalid(format!("Invalid JWT header: {}", e)))?;

    let key_id = header
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or_else(|| PdpError::SignatureInvalid("JWT missing kid in header".to_string()))?;

    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| PdpError::SignatureInvalid("JWT missing payload segment".to_string()))?;
    let payload = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| PdpError::SignatureInvalid(format!("JWT payload is not base64url: {}", e)))?;
    let claims: Map<String, Value> = serde_json::from_slice(&payload)
        .map_err(|e| PdpError::SignatureInvalid(format!("JWT payload is not a JSON object: {}", e)))?;
    if claims.is_empty() {
        return Err(PdpError::SignatureInvalid("JWT payload is empty".to_string()));
    }

    Ok(UnverifiedToken {
        key_id,
        algorithm: header.alg,
    })
}

/// Verifies token signatures and registered claims
#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    expectations: TokenExpectations,
}

impl SignatureVerifier {
    pub fn new(expectations: TokenExpectations) -> Self {
        Self { expectations }
    }

    pub fn expectations(&self) -> &TokenExpectations {
        &self.expectations
    }

    /// Verify `token` against `key` and the configured issuer and audience
    pub fn verify(&self, token: &str, key: &VerificationKey) -> Result<DecodedToken> {
        let unverified = inspect(token)?;
        if unverified.key_id != key.key_id {
            return Err(PdpError::SignatureInvalid(format!(
                "Token kid {} does not match key {}",
                unverified.key_id, key.key_id
            )));
        }

        // The key decides the algorithm, never the token.
        if unverified.algorithm != key.algorithm {
            tracing::warn!(
                "JWT header algorithm ({:?}) doesn't match key algorithm ({:?}) for kid {}. Using key algorithm.",
                unverified.algorithm, key.algorithm, key.key_id
            );
        }

        let mut validation = Validation::new(key.algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&self.required_claims());

        match &self.expectations.issuer {
            Some(issuer) => validation.set_issuer(&[issuer]),
            None => tracing::debug!("Skipping issuer validation as configured"),
        }

        match &self.expectations.audience {
            Some(audience) => {
                tracing::debug!("Validating audience against: {}", audience);
                validation.set_audience(&[audience]);
            }
            None => {
                tracing::debug!("Skipping audience validation as configured");
                validation.validate_aud = false;
            }
        }

        let token_data = decode::<TokenClaims>(token, &key.decoding_key, &validation).map_err(classify)?;

        if token_data.claims.sub.trim().is_empty() {
            return Err(PdpError::ClaimMismatch("JWT missing sub claim".to_string()));
        }

        Ok(DecodedToken {
            key_id: unverified.key_id,
            claims: token_data.claims,
        })
    }

    /// `exp` always; `iss` and `aud` when they are checked
    ///
    /// jsonwebtoken only compares issuer and audience when the token carries
    /// them, so a configured check must also make the claim mandatory.
    fn required_claims(&self) -> Vec<&'static str> {
        let mut required = vec!["exp"];
        if self.expectations.issuer.is_some() {
            required.push("iss");
        }
        if self.expectations.audience.is_some() {
            required.push("aud");
        }
        required
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> PdpError {
    match err.kind() {
        ErrorKind::ExpiredSignature => PdpError::TokenExpired(err.to_string()),
        ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidSubject
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_) => PdpError::ClaimMismatch(err.to_string()),
        _ => PdpError::SignatureInvalid(format!("JWT validation failed: {}", err)),
    }
}
