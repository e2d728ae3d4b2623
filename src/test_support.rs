//! Shared fixtures for unit tests: real RS256 keys and an in-memory key set

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::jwk::{JwkSet, KeyAlgorithm};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use crate::authorizer::keys::KeySetSource;
use crate::error::{PdpError, Result};

pub const PRIMARY_KID: &str = "primary-2024";
pub const SECONDARY_KID: &str = "secondary-2024";
pub const ISSUER: &str = "https://idp.example.com/oauth2/default";
pub const AUDIENCE: &str = "api://messages";
pub const API_KEY: &str = "0123456789abcdef0123";
pub const METHOD_ARN: &str = "arn:aws:execute-api:eu-west-1:123456789012:abc123/dev/GET/messages";

const SIGNING_KEY: &[u8] = include_bytes!("../testdata/signing_key.pem");
const FOREIGN_KEY: &[u8] = include_bytes!("../testdata/foreign_key.pem");
const JWKS: &str = include_str!("../testdata/jwks.json");

pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

pub fn sample_jwks() -> JwkSet {
    serde_json::from_str(JWKS).unwrap()
}

/// The sample key set with `PRIMARY_KID` published under another `alg`
pub fn jwks_with_algorithm(algorithm: KeyAlgorithm) -> JwkSet {
    let mut jwks = sample_jwks();
    for jwk in &mut jwks.keys {
        if jwk.common.key_id.as_deref() == Some(PRIMARY_KID) {
            jwk.common.key_algorithm = Some(algorithm);
        }
    }
    jwks
}

/// Claims for a valid token carrying `scp`
pub fn bearer_claims(scopes: Value) -> Value {
    json!({
        "sub": "user-42",
        "iss": ISSUER,
        "aud": AUDIENCE,
        "exp": now() + 3600,
        "iat": now(),
        "scp": scopes,
    })
}

fn sign_with(key: &[u8], algorithm: Algorithm, claims: &Value, kid: Option<&str>) -> String {
    let mut header = Header::new(algorithm);
    header.kid = kid.map(str::to_string);
    encode(&header, claims, &EncodingKey::from_rsa_pem(key).unwrap()).unwrap()
}

/// Sign with the key published under `PRIMARY_KID`
pub fn sign(claims: &Value, kid: Option<&str>) -> String {
    sign_with(SIGNING_KEY, Algorithm::RS256, claims, kid)
}

/// Sign with the primary key using another RSA algorithm
pub fn sign_with_algorithm(claims: &Value, kid: &str, algorithm: Algorithm) -> String {
    sign_with(SIGNING_KEY, algorithm, claims, Some(kid))
}

/// Sign with a key the key set does not publish under `kid`
pub fn sign_with_foreign_key(claims: &Value, kid: &str) -> String {
    sign_with(FOREIGN_KEY, Algorithm::RS256, claims, Some(kid))
}

/// Key set source serving a fixed set and counting fetches
pub struct StaticKeySet {
    jwks: Option<JwkSet>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl StaticKeySet {
    pub fn new(jwks: JwkSet) -> Self {
        Self {
            jwks: Some(jwks),
            delay: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            jwks: None,
            delay: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySetSource for StaticKeySet {
    async fn fetch(&self) -> Result<JwkSet> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.jwks
            .clone()
            .ok_or_else(|| PdpError::UpstreamUnavailable("JWKS fetch failed with status: 503".to_string()))
    }
}
