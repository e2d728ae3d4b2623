//! Configuration parsing module for PDP
//!
//! Configuration is loaded either from a TOML file or from the process
//! environment (the variables a gateway authorizer function is usually
//! deployed with).
//!
//! # Example
//!
//! ```rust,ignore
//! use pdp::config::PdpConfig;
//!
//! let config = PdpConfig::load("pdp.toml")?;
//! config.validate()?;
//! ```

use crate::authorizer::types::PermissionTier;
use crate::authorizer::verify::TokenExpectations;
use crate::{PdpError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";
pub const DEFAULT_API_KEY_MIN_LENGTH: usize = 16;
pub const DEFAULT_BYPASS_PATH: &str = "/authorize";
pub const DEFAULT_KEY_FETCH_TIMEOUT_SECS: u64 = 5;

fn default_api_key_header() -> String {
    DEFAULT_API_KEY_HEADER.to_string()
}

fn default_api_key_min_length() -> usize {
    DEFAULT_API_KEY_MIN_LENGTH
}

fn default_bypass_path() -> String {
    DEFAULT_BYPASS_PATH.to_string()
}

fn default_key_fetch_timeout_secs() -> u64 {
    DEFAULT_KEY_FETCH_TIMEOUT_SECS
}

fn default_read_scopes() -> Vec<String> {
    vec!["message.read".to_string()]
}

fn default_write_scopes() -> Vec<String> {
    vec!["message.write".to_string()]
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdpConfig {
    /// Shared secret accepted by the API key and Basic schemes
    #[serde(default)]
    pub api_key: Option<String>,

    /// Header carrying an API key
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    /// Shortest API key value accepted from a request
    #[serde(default = "default_api_key_min_length")]
    pub api_key_min_length: usize,

    /// Resource path that does not need the token mode flag
    #[serde(default = "default_bypass_path")]
    pub bypass_path: String,

    /// Signed token verification section
    #[serde(default)]
    pub oauth: Option<OauthConfig>,

    /// Recognized scope literals
    #[serde(default)]
    pub scopes: ScopePolicy,
}

impl Default for PdpConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_header: default_api_key_header(),
            api_key_min_length: default_api_key_min_length(),
            bypass_path: default_bypass_path(),
            oauth: None,
            scopes: ScopePolicy::default(),
        }
    }
}

/// Signed token verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OauthConfig {
    /// Expected `iss` claim; empty skips issuer validation
    #[serde(default)]
    pub issuer: String,

    /// Key set endpoint
    pub jwks_uri: String,

    /// Expected `aud` claim; empty skips audience validation
    #[serde(default)]
    pub audience: String,

    /// Deadline for a key set fetch
    #[serde(default = "default_key_fetch_timeout_secs")]
    pub key_fetch_timeout_secs: u64,
}

impl OauthConfig {
    /// Convert to the claim expectations used by the signature verifier
    pub fn expectations(&self) -> TokenExpectations {
        TokenExpectations {
            issuer: Some(self.issuer.clone()).filter(|issuer| !issuer.is_empty()),
            audience: Some(self.audience.clone()).filter(|audience| !audience.is_empty()),
        }
    }

    pub fn key_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.key_fetch_timeout_secs)
    }
}

/// Recognized scope literals and the unscoped-token policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopePolicy {
    /// Literals granting the read tier
    #[serde(default = "default_read_scopes")]
    pub read: Vec<String>,

    /// Literals granting the write tier
    #[serde(default = "default_write_scopes")]
    pub write: Vec<String>,

    /// Tier for tokens without a recognized scope; unset fails closed
    #[serde(default)]
    pub default_tier: Option<PermissionTier>,
}

impl Default for ScopePolicy {
    fn default() -> Self {
        Self {
            read: default_read_scopes(),
            write: default_write_scopes(),
            default_tier: None,
        }
    }
}

impl ScopePolicy {
    /// Tier granted by a scope literal, if it is recognized
    pub fn tier_of(&self, scope: &str) -> Option<PermissionTier> {
        if self.read.iter().any(|s| s == scope) {
            Some(PermissionTier::Read)
        } else if self.write.iter().any(|s| s == scope) {
            Some(PermissionTier::Write)
        } else {
            None
        }
    }

    /// All recognized literals, read first
    pub fn recognized(&self) -> Vec<String> {
        self.read.iter().chain(self.write.iter()).cloned().collect()
    }
}

impl PdpConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_config(path)
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Recognized variables: `API_KEY`, `API_KEY_HEADER`, `TOKEN_ISSUER`,
    /// `JWKS_URI`, `AUDIENCE`, `READ_SCOPES`, `WRITE_SCOPES`, `DEFAULT_TIER`.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let list = |value: String| -> Vec<String> {
            value
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut config = PdpConfig {
            api_key: var("API_KEY"),
            ..PdpConfig::default()
        };

        if let Some(header) = var("API_KEY_HEADER") {
            config.api_key_header = header;
        }

        if let Some(jwks_uri) = var("JWKS_URI") {
            config.oauth = Some(OauthConfig {
                issuer: var("TOKEN_ISSUER").unwrap_or_default(),
                jwks_uri,
                audience: var("AUDIENCE").unwrap_or_default(),
                key_fetch_timeout_secs: DEFAULT_KEY_FETCH_TIMEOUT_SECS,
            });
        }

        if let Some(read) = var("READ_SCOPES") {
            config.scopes.read = list(read);
        }
        if let Some(write) = var("WRITE_SCOPES") {
            config.scopes.write = list(write);
        }
        if let Some(tier) = var("DEFAULT_TIER") {
            config.scopes.default_tier = Some(match tier.to_ascii_lowercase().as_str() {
                "read" => PermissionTier::Read,
                "write" => PermissionTier::Write,
                other => return Err(PdpError::Config(format!("Unknown DEFAULT_TIER: {}", other))),
            });
        }

        Ok(config)
    }

    /// Check that the configuration can authorize anything at all
    pub fn validate(&self) -> Result<()> {
        let has_api_key = self.api_key.as_deref().is_some_and(|key| !key.is_empty());
        if !has_api_key && self.oauth.is_none() {
            return Err(PdpError::Config(
                "Neither api_key nor an [oauth] section is configured".to_string(),
            ));
        }

        if let Some(oauth) = &self.oauth {
            if oauth.jwks_uri.trim().is_empty() {
                return Err(PdpError::Config("oauth.jwks_uri must not be empty".to_string()));
            }
            if oauth.key_fetch_timeout_secs == 0 {
                return Err(PdpError::Config("oauth.key_fetch_timeout_secs must be positive".to_string()));
            }
        }

        if self.api_key_header.trim().is_empty() {
            return Err(PdpError::Config("api_key_header must not be empty".to_string()));
        }

        if self.scopes.read.is_empty() && self.scopes.write.is_empty() {
            return Err(PdpError::Config("At least one scope literal must be recognized".to_string()));
        }

        if let Some(overlap) = self.scopes.read.iter().find(|s| self.scopes.write.contains(s)) {
            return Err(PdpError::Config(format!(
                "Scope literal {} is configured as both read and write",
                overlap
            )));
        }

        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PdpConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| PdpError::Config(format!("Failed to read config file: {}", e)))?;

    toml::from_str(&content)
        .map_err(|e| PdpError::Config(format!("Failed to parse TOML config: {}", e)))
}
