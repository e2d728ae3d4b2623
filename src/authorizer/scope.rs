use std::collections::BTreeSet;

use serde_json::Value;

use crate::config::ScopePolicy;
use crate::error::{PdpError, Result};
use super::types::{ResolvedScope, TokenClaims};

/// Claims that may carry scopes: singular `scp`/`scope`, plural `scopes`
pub const SCOPE_CLAIMS: [&str; 3] = ["scp", "scope", "scopes"];

/// Scope helpers on verified claims
impl TokenClaims {
    /// All scopes from every scope claim, sorted and deduplicated
    ///
    /// Each claim may be a space-delimited string or an array of strings.
    /// Returns `None` when no scope claim is present at all (null and empty
    /// string count as absent); an array with no usable entries is present
    /// but empty.
    pub fn scopes(&self) -> Option<BTreeSet<String>> {
        let mut present = false;
        let mut scopes = BTreeSet::new();

        for name in SCOPE_CLAIMS {
            match self.extra.get(name) {
                Some(Value::String(s)) if !s.trim().is_empty() => {
                    present = true;
                    scopes.extend(s.split_whitespace().map(str::to_string));
                }
                Some(Value::Array(values)) => {
                    present = true;
                    scopes.extend(
                        values
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string),
                    );
                }
                Some(Value::Null) | Some(Value::String(_)) | None => {}
                Some(_) => present = true,
            }
        }

        present.then_some(scopes)
    }
}

/// Maps verified claims to a permission tier
#[derive(Debug, Clone, Default)]
pub struct ScopeResolver {
    policy: ScopePolicy,
}

impl ScopeResolver {
    pub fn new(policy: ScopePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScopePolicy {
        &self.policy
    }

    /// Resolve the tier: the lexicographically first recognized scope wins
    pub fn resolve(&self, claims: &TokenClaims) -> Result<ResolvedScope> {
        let Some(scopes) = claims.scopes() else {
            return self.fallback().ok_or(PdpError::NoScopesPresent);
        };

        // BTreeSet iterates in sorted order, so claim order never matters.
        for scope in &scopes {
            if let Some(tier) = self.policy.tier_of(scope) {
                return Ok(ResolvedScope {
                    tier,
                    scope: Some(scope.clone()),
                });
            }
        }

        self.fallback()
            .ok_or_else(|| PdpError::InsufficientScope(self.policy.recognized()))
    }

    fn fallback(&self) -> Option<ResolvedScope> {
        self.policy.default_tier.map(|tier| ResolvedScope { tier, scope: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorizer::types::PermissionTier;
    use serde_json::json;
    use std::collections::HashMap;

    fn claims_with(name: &str, value: Value) -> TokenClaims {
        let mut extra = HashMap::new();
        extra.insert(name.to_string(), value);

        TokenClaims {
            sub: "user123".to_string(),
            iss: Some("test-issuer".to_string()),
            aud: None,
            exp: Some(9_999_999_999.0),
            iat: None,
            extra,
        }
    }

    fn no_scope_claims() -> TokenClaims {
        TokenClaims {
            sub: "user123".to_string(),
            iss: None,
            aud: None,
            exp: Some(9_999_999_999.0),
            iat: None,
            extra: HashMap::new(),
        }
    }

    #[test]
    fn test_scopes_space_separated() {
        let claims = claims_with("scope", json!("message.write openid  profile"));
        let scopes: Vec<String> = claims.scopes().unwrap().into_iter().collect();
        assert_eq!(scopes, vec!["message.write", "openid", "profile"]);
    }

    #[test]
    fn test_scopes_array() {
        let claims = claims_with("scopes", json!(["message.read", 7, "", "openid"]));
        let scopes: Vec<String> = claims.scopes().unwrap().into_iter().collect();
        assert_eq!(scopes, vec!["message.read", "openid"]);
    }

    #[test]
    fn test_scopes_missing_or_null() {
        assert!(no_scope_claims().scopes().is_none());
        assert!(claims_with("scp", Value::Null).scopes().is_none());
        assert!(claims_with("scp", json!("")).scopes().is_none());
        assert_eq!(claims_with("scp", json!([])).scopes(), Some(BTreeSet::new()));
    }

    #[test]
    fn test_resolve_read_and_write() {
        let resolver = ScopeResolver::default();
        let read = resolver.resolve(&claims_with("scp", json!(["message.read"]))).unwrap();
        assert_eq!(read.tier, PermissionTier::Read);
        assert_eq!(read.scope.as_deref(), Some("message.read"));

        let write = resolver.resolve(&claims_with("scp", json!("openid message.write"))).unwrap();
        assert_eq!(write.tier, PermissionTier::Write);
    }

    #[test]
    fn test_resolve_is_order_independent() {
        let resolver = ScopeResolver::default();
        let first = resolver
            .resolve(&claims_with("scp", json!(["message.write", "message.read"])))
            .unwrap();
        let second = resolver
            .resolve(&claims_with("scp", json!(["message.read", "message.write"])))
            .unwrap();
        assert_eq!(first, second);
        // "message.read" sorts before "message.write"
        assert_eq!(first.tier, PermissionTier::Read);
    }

    #[test]
    fn test_resolve_alternate_literals() {
        let resolver = ScopeResolver::new(ScopePolicy {
            read: vec!["message.view".to_string()],
            write: vec!["message.edit".to_string()],
            default_tier: None,
        });
        // "message.edit" sorts before "message.view"
        let resolved = resolver
            .resolve(&claims_with("scopes", json!(["message.view", "message.edit"])))
            .unwrap();
        assert_eq!(resolved.tier, PermissionTier::Write);
        assert_eq!(resolved.scope.as_deref(), Some("message.edit"));
    }

    #[test]
    fn test_resolve_no_scopes() {
        let err = ScopeResolver::default().resolve(&no_scope_claims()).unwrap_err();
        assert!(matches!(err, PdpError::NoScopesPresent));
    }

    #[test]
    fn test_resolve_insufficient_scope() {
        let err = ScopeResolver::default()
            .resolve(&claims_with("scp", json!(["openid", "profile"])))
            .unwrap_err();
        assert!(matches!(err, PdpError::InsufficientScope(ref recognized) if recognized.len() == 2));
    }

    #[test]
    fn test_resolve_default_tier() {
        let resolver = ScopeResolver::new(ScopePolicy {
            default_tier: Some(PermissionTier::Read),
            ..ScopePolicy::default()
        });
        let resolved = resolver.resolve(&no_scope_claims()).unwrap();
        assert_eq!(resolved, ResolvedScope { tier: PermissionTier::Read, scope: None });

        let resolved = resolver.resolve(&claims_with("scp", json!(["openid"]))).unwrap();
        assert_eq!(resolved.tier, PermissionTier::Read);
    }

    #[test]
    fn test_edge_case_unicode_scope() {
        let claims = claims_with("scope", json!("read:文档 message.read"));
        assert!(claims.scopes().unwrap().contains("read:文档"));
        let resolved = ScopeResolver::default().resolve(&claims).unwrap();
        assert_eq!(resolved.tier, PermissionTier::Read);
    }
}
