//! Access decisions and their gateway policy representation
//!
//! See <http://docs.aws.amazon.com/apigateway/latest/developerguide/use-custom-authorizer.html>
//! for the policy shape the gateway expects.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PdpError, Result};
use super::types::{AccessDecision, Effect, PermissionTier};

pub const POLICY_VERSION: &str = "2012-10-17";
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// Parsed method descriptor
///
/// `arn:<partition>:execute-api:<region>:<account>:<api>/<stage>/<method>/<path...>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodArn {
    pub partition: String,
    pub region: String,
    pub account: String,
    pub rest_api_id: String,
    pub stage: String,
    pub method: Option<String>,
    pub path: Option<String>,
}

impl MethodArn {
    pub fn parse(descriptor: &str) -> Result<Self> {
        let malformed = |reason: &str| PdpError::MalformedDescriptor(format!("{}: {}", reason, descriptor));

        let sections: Vec<&str> = descriptor.splitn(6, ':').collect();
        let [arn, partition, service, region, account, resource] = sections.as_slice() else {
            return Err(malformed("expected six colon-delimited sections"));
        };
        if *arn != "arn" || *service != "execute-api" {
            return Err(malformed("not an execute-api ARN"));
        }
        if [partition, region, account].iter().any(|s| s.is_empty()) {
            return Err(malformed("empty partition, region or account"));
        }

        let mut parts = resource.splitn(4, '/');
        let rest_api_id = parts.next().unwrap_or_default();
        let stage = parts.next().unwrap_or_default();
        if rest_api_id.is_empty() || stage.is_empty() {
            return Err(malformed("missing API id or stage"));
        }
        let method = parts.next().filter(|m| !m.is_empty()).map(str::to_string);
        let path = parts.next().map(str::to_string);

        Ok(Self {
            partition: partition.to_string(),
            region: region.to_string(),
            account: account.to_string(),
            rest_api_id: rest_api_id.to_string(),
            stage: stage.to_string(),
            method,
            path,
        })
    }

    /// Resource identifier for the whole API stage
    pub fn base_resource(&self) -> String {
        format!(
            "arn:{}:execute-api:{}:{}:{}/{}",
            self.partition, self.region, self.account, self.rest_api_id, self.stage
        )
    }
}

impl FromStr for MethodArn {
    type Err = PdpError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for MethodArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_resource())?;
        if let Some(method) = &self.method {
            write!(f, "/{}", method)?;
            if let Some(path) = &self.path {
                write!(f, "/{}", path)?;
            }
        }
        Ok(())
    }
}

/// Compute the decision for a principal at a tier
///
/// Read narrows the resource to `GET` on every path, write opens every
/// method, and no tier denies the unnarrowed stage resource.
pub fn build_decision(
    principal_id: &str,
    tier: Option<PermissionTier>,
    method_arn: &MethodArn,
) -> AccessDecision {
    let base = method_arn.base_resource();
    let (effect, resource) = match tier {
        Some(PermissionTier::Read) => (Effect::Allow, format!("{}/GET/*", base)),
        Some(PermissionTier::Write) => (Effect::Allow, format!("{}/*/*", base)),
        None => (Effect::Deny, base),
    };

    let mut context = BTreeMap::new();
    context.insert("user".to_string(), principal_id.to_string());

    AccessDecision {
        principal_id: principal_id.to_string(),
        effect,
        resource,
        context,
    }
}

impl AccessDecision {
    /// Add an entry to the decision context
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Whether this decision lets the caller invoke `target`
    pub fn permits(&self, target: &MethodArn) -> bool {
        if self.effect != Effect::Allow {
            return false;
        }
        let Some(scope) = self
            .resource
            .strip_prefix(&target.base_resource())
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return false;
        };
        let granted = scope.split('/').next().unwrap_or_default();
        match &target.method {
            _ if granted == "*" => true,
            Some(method) => granted.eq_ignore_ascii_case(method),
            None => false,
        }
    }

    /// Render the gateway policy representation
    pub fn to_policy(&self) -> PolicyResponse {
        let mut statement = Vec::with_capacity(1);
        if !self.resource.is_empty() {
            statement.push(Statement {
                action: INVOKE_ACTION.to_string(),
                effect: self.effect,
                resource: self.resource.clone(),
            });
        }

        PolicyResponse {
            principal_id: self.principal_id.clone(),
            policy_document: PolicyDocument {
                version: POLICY_VERSION.to_string(),
                statement,
            },
            context: self.context.clone(),
        }
    }
}

/// Gateway authorizer response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResponse {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub action: String,
    pub effect: Effect,
    pub resource: String,
}
