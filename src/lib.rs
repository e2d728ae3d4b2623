//! # PDP - Policy Decision Point
//!
//! Request authorization for API gateway custom authorizers. Given a
//! description of an inbound request, PDP decides whether the caller
//! presented a valid API key, Basic credential or signed bearer token,
//! resolves the caller's permission tier and returns a policy scoped to the
//! exact resource the caller may invoke.
//!
//! ## Features
//!
//! - `gate`: tower/axum layer enforcing decisions in front of handlers
//!
//! ```rust,ignore
//! use pdp::{Authorizer, KeyCache, PdpConfig};
//!
//! let config = PdpConfig::from_env()?;
//! let authorizer = Authorizer::new(&config, KeyCache::new())?;
//! let policy = authorizer.authorize_policy(&request).await?;
//! ```

pub mod error;
pub use error::{PdpError, Result};

pub mod config;
pub use config::{OauthConfig, PdpConfig, ScopePolicy};

pub mod authorizer;
pub use authorizer::{
    AccessDecision, Authorizer, AuthorizerRequest, Credential, CredentialKind, Effect, KeyCache,
    PermissionTier, PolicyResponse,
};

pub mod messaging;

#[cfg(feature = "gate")]
pub mod gate;

#[cfg(test)]
pub(crate) mod test_support;
