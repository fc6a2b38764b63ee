//! Authorizer input types.
//!
//! [`RequestDescriptor`] is what the decision engine reads. The gateway
//! hands us a richer [`GatewayAuthorizerEvent`] where every nesting level
//! may be missing; [`GatewayAuthorizerEvent::to_descriptor`] flattens it
//! with explicit presence checks.

use serde::{Deserialize, Serialize};

/// Everything the decision depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    /// Opaque resource/method identifier. Echoed verbatim into the policy.
    pub resource_identifier: String,

    /// PEM client certificate from the mTLS handshake, if one was presented.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_client_certificate: Option<String>,
}

impl RequestDescriptor {
    /// Descriptor for `resource` with no certificate.
    pub fn new(resource_identifier: impl Into<String>) -> Self {
        Self {
            resource_identifier: resource_identifier.into(),
            raw_client_certificate: None,
        }
    }

    /// Attach a PEM client certificate.
    #[must_use]
    pub fn with_certificate(mut self, pem: impl Into<String>) -> Self {
        self.raw_client_certificate = Some(pem.into());
        self
    }

    /// The certificate payload, or `None` when absent or blank.
    #[must_use]
    pub fn presented_certificate(&self) -> Option<&str> {
        self.raw_client_certificate
            .as_deref()
            .filter(|pem| !pem.trim().is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gateway event
// ─────────────────────────────────────────────────────────────────────────────

/// Authorizer event as delivered by the API gateway.
///
/// Only `methodArn` and `requestContext.identity.clientCert.clientCertPem`
/// affect the decision. The whole event, transport-reported DN fields and
/// source address included, travels with both audit records of the
/// request (see [`AuditEvent`](crate::authorizer::AuditEvent)).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayAuthorizerEvent {
    /// Authorizer type (`REQUEST`, `TOKEN`).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    /// ARN of the method being invoked.
    #[serde(default)]
    pub method_arn: String,

    /// Request context, when the gateway supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_context: Option<RequestContext>,
}

/// `requestContext` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// Caller identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<CallerIdentity>,
}

/// `requestContext.identity` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    /// Caller source address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,

    /// Client certificate details from the mTLS handshake.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert: Option<ClientCertInfo>,
}

/// `requestContext.identity.clientCert` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCertInfo {
    /// PEM encoded certificate.
    #[serde(
        default,
        rename = "clientCertPem",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_cert_pem: Option<String>,

    /// Subject DN as reported by the transport. Informational only.
    #[serde(default, rename = "subjectDN", skip_serializing_if = "Option::is_none")]
    pub subject_dn: Option<String>,

    /// Issuer DN as reported by the transport. Informational only.
    #[serde(default, rename = "issuerDN", skip_serializing_if = "Option::is_none")]
    pub issuer_dn: Option<String>,

    /// Serial number as reported by the transport.
    #[serde(
        default,
        rename = "serialNumber",
        skip_serializing_if = "Option::is_none"
    )]
    pub serial_number: Option<String>,

    /// Validity window as reported by the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity: Option<CertValidity>,
}

/// `clientCert.validity` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertValidity {
    /// Start of validity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,
    /// End of validity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_after: Option<String>,
}

impl GatewayAuthorizerEvent {
    /// Client certificate block, if every enclosing level is present.
    #[must_use]
    pub fn client_cert(&self) -> Option<&ClientCertInfo> {
        self.request_context
            .as_ref()?
            .identity
            .as_ref()?
            .client_cert
            .as_ref()
    }

    /// Flatten into the engine's input.
    #[must_use]
    pub fn to_descriptor(&self) -> RequestDescriptor {
        RequestDescriptor {
            resource_identifier: self.method_arn.clone(),
            raw_client_certificate: self
                .client_cert()
                .and_then(|cert| cert.client_cert_pem.clone()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ARN: &str = "arn:aws:execute-api:us-east-1:123456789012:abcdef123/test/GET/hello";

    fn event(value: serde_json::Value) -> GatewayAuthorizerEvent {
        serde_json::from_value(value).expect("event should deserialize")
    }

    #[test]
    fn full_event_yields_pem_and_arn() {
        let ev = event(json!({
            "type": "REQUEST",
            "methodArn": ARN,
            "requestContext": {
                "identity": {
                    "sourceIp": "203.0.113.7",
                    "clientCert": {
                        "clientCertPem": "-----BEGIN CERTIFICATE-----\n...",
                        "subjectDN": "CN=reported",
                        "issuerDN": "CN=issuer",
                        "serialNumber": "01",
                        "validity": { "notBefore": "a", "notAfter": "b" }
                    }
                }
            }
        }));

        let descriptor = ev.to_descriptor();
        assert_eq!(descriptor.resource_identifier, ARN);
        assert_eq!(
            descriptor.raw_client_certificate.as_deref(),
            Some("-----BEGIN CERTIFICATE-----\n...")
        );
        assert_eq!(
            ev.client_cert().and_then(|c| c.subject_dn.as_deref()),
            Some("CN=reported")
        );
    }

    #[test]
    fn missing_levels_yield_no_certificate() {
        for value in [
            json!({ "methodArn": ARN }),
            json!({ "methodArn": ARN, "requestContext": {} }),
            json!({ "methodArn": ARN, "requestContext": { "identity": {} } }),
            json!({ "methodArn": ARN, "requestContext": { "identity": { "clientCert": {} } } }),
            json!({ "methodArn": ARN, "requestContext": { "identity": { "clientCert": null } } }),
        ] {
            let descriptor = event(value).to_descriptor();
            assert_eq!(descriptor.resource_identifier, ARN);
            assert!(descriptor.raw_client_certificate.is_none());
        }
    }

    #[test]
    fn missing_method_arn_defaults_to_empty() {
        let descriptor = event(json!({})).to_descriptor();
        assert_eq!(descriptor.resource_identifier, "");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let ev = event(json!({
            "methodArn": ARN,
            "headers": { "x": "y" },
            "requestContext": { "stage": "test", "identity": { "userAgent": "curl" } }
        }));
        assert_eq!(ev.method_arn, ARN);
    }

    #[test]
    fn blank_certificate_is_not_presented() {
        let descriptor = RequestDescriptor::new(ARN).with_certificate("  \n\t ");
        assert!(descriptor.presented_certificate().is_none());

        let descriptor = RequestDescriptor::new(ARN).with_certificate("");
        assert!(descriptor.presented_certificate().is_none());

        let descriptor = RequestDescriptor::new(ARN).with_certificate("invalid-cert");
        assert_eq!(descriptor.presented_certificate(), Some("invalid-cert"));
    }
}
