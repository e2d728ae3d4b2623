//! Request authorization decision engine
//!
//! Data flows one way through the submodules: a raw request is classified
//! into a credential ([`extract`]), bearer tokens are checked against keys
//! from a remote key set ([`keys`], [`verify`]), verified claims map to a
//! permission tier ([`scope`]), and the tier becomes a scoped decision
//! ([`decision`]). [`orchestrator`] composes them into [`Authorizer`].

pub mod types;
pub mod extract;
pub mod keys;
pub mod verify;
pub mod scope;
pub mod decision;
pub mod orchestrator;

pub use types::*;
pub use decision::{build_decision, MethodArn, PolicyDocument, PolicyResponse, Statement};
pub use extract::TokenExtractor;
pub use keys::{HttpKeySetSource, KeyCache, KeyResolver, KeySetSource};
pub use orchestrator::{Authorizer, API_KEY_PRINCIPAL};
pub use scope::ScopeResolver;
pub use verify::{SignatureVerifier, TokenExpectations};
