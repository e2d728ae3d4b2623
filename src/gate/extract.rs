//! Axum integration for PDP decisions
//!
//! - Building an [`AuthorizerRequest`] from HTTP request parts
//! - `FromRequestParts` extractor for the [`AccessDecision`] the gate stored

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, Method, StatusCode},
};
use std::collections::HashMap;
use std::ops::Deref;

use crate::authorizer::extract::TOKEN_MODE;
use crate::authorizer::types::{AccessDecision, AuthorizerRequest};

/// Describe an HTTP request the way a gateway would
///
/// `method_arn_prefix` is the stage resource,
/// `arn:<partition>:execute-api:<region>:<account>:<api>/<stage>`.
/// Headers that are not visible ASCII are dropped.
pub fn describe_request(
    method_arn_prefix: &str,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
) -> AuthorizerRequest {
    let headers: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();

    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    AuthorizerRequest {
        auth_type: Some(TOKEN_MODE.to_string()),
        authorization_token: None,
        headers,
        method_arn: format!("{}/{}{}", method_arn_prefix.trim_end_matches('/'), method.as_str(), path),
        resource: Some(path),
    }
}

/// Axum extractor for the caller's access decision
///
/// The decision must be inserted by [`RequireAccess`](super::RequireAccess)
/// before this extractor runs.
///
/// # Example
///
/// ```rust,ignore
/// use pdp::gate::Principal;
///
/// async fn handler(principal: Principal) -> String {
///     format!("User: {}", principal.principal_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Principal(pub AccessDecision);

impl Deref for Principal {
    type Target = AccessDecision;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<AccessDecision> for Principal {
    fn from(decision: AccessDecision) -> Self {
        Self(decision)
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessDecision>()
            .cloned()
            .map(Principal)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
