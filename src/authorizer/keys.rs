//! Verification key resolution from a remote key set

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use reqwest::Client;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::{PdpError, Result};
use super::types::VerificationKey;

/// Pick the verification algorithm for a JWK
///
/// The key's published `alg` wins when it fits the key type; otherwise the
/// key type decides (RSA → RS256, P-256 → ES256, P-384 → ES384, OKP → EdDSA).
pub fn jwk_algorithm_to_algorithm(jwk: &Jwk) -> Result<Algorithm> {
    let by_key_type = match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => Algorithm::RS256,
        AlgorithmParameters::EllipticCurve(params) => match &params.curve {
            EllipticCurve::P256 => Algorithm::ES256,
            EllipticCurve::P384 => Algorithm::ES384,
            other => {
                return Err(PdpError::SignatureInvalid(format!(
                    "Unsupported elliptic curve for JWK: {:?}",
                    other
                )))
            }
        },
        AlgorithmParameters::OctetKey(_) => {
            return Err(PdpError::SignatureInvalid(
                "HMAC keys not supported for token verification".to_string(),
            ))
        }
        AlgorithmParameters::OctetKeyPair(_) => Algorithm::EdDSA,
    };

    let Some(published) = &jwk.common.key_algorithm else {
        return Ok(by_key_type);
    };
    let algorithm = match published {
        KeyAlgorithm::RS256 => Algorithm::RS256,
        KeyAlgorithm::RS384 => Algorithm::RS384,
        KeyAlgorithm::RS512 => Algorithm::RS512,
        KeyAlgorithm::PS256 => Algorithm::PS256,
        KeyAlgorithm::PS384 => Algorithm::PS384,
        KeyAlgorithm::PS512 => Algorithm::PS512,
        KeyAlgorithm::ES256 => Algorithm::ES256,
        KeyAlgorithm::ES384 => Algorithm::ES384,
        KeyAlgorithm::EdDSA => Algorithm::EdDSA,
        other => {
            return Err(PdpError::SignatureInvalid(format!(
                "JWK alg {:?} is not a supported signature algorithm",
                other
            )))
        }
    };

    let fits = match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => matches!(
            algorithm,
            Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512
        ),
        _ => algorithm == by_key_type,
    };
    if !fits {
        return Err(PdpError::SignatureInvalid(format!(
            "JWK alg {:?} does not match its key type",
            algorithm
        )));
    }
    Ok(algorithm)
}

/// Turn a fetched key set into verification keys, skipping unusable entries
pub fn parse_key_set(jwk_set: &JwkSet) -> Vec<VerificationKey> {
    let mut keys = Vec::with_capacity(jwk_set.keys.len());
    for jwk in &jwk_set.keys {
        let Some(kid) = &jwk.common.key_id else {
            tracing::warn!("JWK missing kid field, skipping");
            continue;
        };
        let algorithm = match jwk_algorithm_to_algorithm(jwk) {
            Ok(algorithm) => algorithm,
            Err(e) => {
                tracing::warn!("Unsupported algorithm for kid {}: {}", kid, e);
                continue;
            }
        };
        match DecodingKey::from_jwk(jwk) {
            Ok(decoding_key) => {
                tracing::debug!("Parsed key {}: algorithm={:?}", kid, algorithm);
                keys.push(VerificationKey {
                    key_id: kid.clone(),
                    algorithm,
                    decoding_key,
                });
            }
            Err(err) => {
                tracing::warn!("Failed to create decoding key for kid {}: {}", kid, err);
            }
        }
    }
    keys
}

/// Where key sets come from
#[async_trait]
pub trait KeySetSource: Send + Sync {
    /// Fetch the current key set
    async fn fetch(&self) -> Result<JwkSet>;
}

/// Key set source reading a JWKS endpoint over HTTPS
#[derive(Clone)]
pub struct HttpKeySetSource {
    http_client: Client,
    jwks_uri: String,
}

impl HttpKeySetSource {
    pub fn new(jwks_uri: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            jwks_uri: jwks_uri.into(),
        }
    }

    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<JwkSet> {
        tracing::debug!("Fetching JWKS from: {}", self.jwks_uri);

        let response = self.http_client
            .get(&self.jwks_uri)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| PdpError::UpstreamUnavailable(format!("Failed to fetch JWKS: {}", e)))?;

        if !response.status().is_success() {
            return Err(PdpError::UpstreamUnavailable(format!(
                "JWKS fetch failed with status: {}",
                response.status()
            )));
        }

        let jwks_text = response
            .text()
            .await
            .map_err(|e| PdpError::UpstreamUnavailable(format!("Failed to read JWKS response: {}", e)))?;

        serde_json::from_str(&jwks_text)
            .map_err(|e| PdpError::UpstreamUnavailable(format!("Failed to parse JWKS: {}", e)))
    }
}

/// Process-wide verification key cache
///
/// Populated lazily on a miss and never cleared; a key is idempotent per
/// kid, so concurrent population of the same entry is harmless. Clones
/// share the same underlying map.
#[derive(Clone, Default)]
pub struct KeyCache {
    keys: Arc<RwLock<HashMap<String, VerificationKey>>>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, kid: &str) -> Option<VerificationKey> {
        self.keys.read().await.get(kid).cloned()
    }

    pub async fn contains(&self, kid: &str) -> bool {
        self.keys.read().await.contains_key(kid)
    }

    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }

    /// Store keys; existing entries for a kid are replaced
    pub async fn insert_all(&self, keys: Vec<VerificationKey>) {
        let mut cache = self.keys.write().await;
        for key in keys {
            cache.insert(key.key_id.clone(), key);
        }
    }
}

/// Resolves key ids to verification keys, consulting the cache first
#[derive(Clone)]
pub struct KeyResolver {
    cache: KeyCache,
    source: Arc<dyn KeySetSource>,
}

impl KeyResolver {
    pub fn new(cache: KeyCache, source: Arc<dyn KeySetSource>) -> Self {
        Self { cache, source }
    }

    pub fn cache(&self) -> &KeyCache {
        &self.cache
    }

    /// Resolve a key id, fetching the key set on a cache miss
    ///
    /// The fetch is bounded by `deadline`; running past it is reported as
    /// [`PdpError::UpstreamUnavailable`]. Nothing is retried.
    pub async fn resolve(&self, kid: &str, deadline: Instant) -> Result<VerificationKey> {
        if let Some(key) = self.cache.get(kid).await {
            tracing::debug!("Verification key cache hit for kid {}", kid);
            return Ok(key);
        }

        tracing::debug!("Verification key cache miss for kid {}", kid);
        let jwk_set = tokio::time::timeout_at(deadline, self.source.fetch())
            .await
            .map_err(|_| PdpError::UpstreamUnavailable("Key set fetch deadline exceeded".to_string()))??;

        let keys = parse_key_set(&jwk_set);
        let found = keys.iter().find(|key| key.key_id == kid).cloned();
        self.cache.insert_all(keys).await;

        found.ok_or_else(|| PdpError::KeyNotFound(kid.to_string()))
    }
}
