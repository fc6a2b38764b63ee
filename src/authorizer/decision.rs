//! Authorization decision types.
//!
//! These serialize to the exact policy shape the gateway consumes:
//!
//! ```json
//! {
//!   "principalId": "CN=test-client,O=Test Organization,C=US",
//!   "policyDocument": {
//!     "Version": "2012-10-17",
//!     "Statement": [{
//!       "Action": "execute-api:Invoke",
//!       "Effect": "Allow",
//!       "Resource": "arn:aws:execute-api:us-east-1:123456789012:abcdef123/test/GET/hello"
//!     }]
//!   },
//!   "context": { "clientCertSubject": "CN=test-client,O=Test Organization,C=US" }
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Policy language version understood by the gateway.
pub const POLICY_VERSION: &str = "2012-10-17";

/// The only action a decision ever scopes.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// Principal reported for every denied request.
pub const UNAUTHORIZED_PRINCIPAL: &str = "unauthorized";

// ─────────────────────────────────────────────────────────────────────────────
// Effect
// ─────────────────────────────────────────────────────────────────────────────

/// Statement effect.
///
/// Serialized as `"Allow"` / `"Deny"` exactly; parsing accepts any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// The invocation is permitted.
    Allow,
    /// The invocation is forbidden.
    Deny,
}

impl Effect {
    /// Wire form of the effect.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("allow") {
            Ok(Self::Allow)
        } else if s.eq_ignore_ascii_case("deny") {
            Ok(Self::Deny)
        } else {
            Err(Error::Internal(format!("unknown policy effect '{s}'")))
        }
    }
}

impl Serialize for Effect {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Effect {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Denial reasons
// ─────────────────────────────────────────────────────────────────────────────

/// Why a request was denied.
///
/// The text of each reason is part of the gateway contract; consumers
/// match on it verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DenialReason {
    /// No client certificate was presented.
    #[serde(rename = "Client certificate required")]
    CertificateRequired,
    /// A certificate was presented but could not be used.
    #[serde(rename = "Invalid client certificate")]
    InvalidCertificate,
}

impl DenialReason {
    /// Contract text of the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CertificateRequired => "Client certificate required",
            Self::InvalidCertificate => "Invalid client certificate",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Policy document
// ─────────────────────────────────────────────────────────────────────────────

/// One policy statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    /// Always [`INVOKE_ACTION`].
    pub action: String,
    /// Allow or deny.
    pub effect: Effect,
    /// Resource identifier copied from the request.
    pub resource: String,
}

/// Policy document scoping a decision to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    /// Always [`POLICY_VERSION`].
    pub version: String,
    /// Exactly one statement.
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    /// Single-statement invoke policy for `resource`.
    #[must_use]
    pub fn invoke(effect: Effect, resource: impl Into<String>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![Statement {
                action: INVOKE_ACTION.to_string(),
                effect,
                resource: resource.into(),
            }],
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

/// Diagnostic context returned alongside the policy.
///
/// Serialized untagged: `{"clientCertSubject": ...}` or `{"reason": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecisionContext {
    /// Allowed: the subject DN of the presented certificate.
    ClientCertSubject {
        /// Same value as the decision's principal.
        #[serde(rename = "clientCertSubject")]
        client_cert_subject: String,
    },
    /// Denied: why.
    Denied {
        /// Contract reason text.
        reason: DenialReason,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision
// ─────────────────────────────────────────────────────────────────────────────

/// Complete authorizer response.
///
/// Construct with [`AuthorizationDecision::allow`] or
/// [`AuthorizationDecision::deny`]; the two constructors are the only way
/// the engine builds decisions, which keeps principal, effect and context
/// consistent with each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDecision {
    /// Subject DN, or `"unauthorized"`.
    pub principal_id: String,
    /// Resource-scoped policy.
    pub policy_document: PolicyDocument,
    /// Diagnostic context.
    pub context: DecisionContext,
}

impl AuthorizationDecision {
    /// Allow `resource` for the certificate subject `subject`.
    #[must_use]
    pub fn allow(subject: impl Into<String>, resource: impl Into<String>) -> Self {
        let subject = subject.into();
        Self {
            principal_id: subject.clone(),
            policy_document: PolicyDocument::invoke(Effect::Allow, resource),
            context: DecisionContext::ClientCertSubject {
                client_cert_subject: subject,
            },
        }
    }

    /// Deny `resource` for `reason`.
    #[must_use]
    pub fn deny(reason: DenialReason, resource: impl Into<String>) -> Self {
        Self {
            principal_id: UNAUTHORIZED_PRINCIPAL.to_string(),
            policy_document: PolicyDocument::invoke(Effect::Deny, resource),
            context: DecisionContext::Denied { reason },
        }
    }

    /// Effect of the (single) statement.
    #[must_use]
    pub fn effect(&self) -> Effect {
        self.policy_document
            .statement
            .first()
            .map_or(Effect::Deny, |s| s.effect)
    }

    /// Resource the decision is scoped to.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.policy_document
            .statement
            .first()
            .map_or("", |s| s.resource.as_str())
    }

    /// `true` for an allow decision.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.effect() == Effect::Allow
    }

    /// Denial reason, if denied.
    #[must_use]
    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self.context {
            DecisionContext::Denied { reason } => Some(reason),
            DecisionContext::ClientCertSubject { .. } => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
