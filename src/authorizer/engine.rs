//! Authorization decision engine.
//!
//! # Decision procedure
//!
//! 1. No certificate (absent, empty or blank) → `Deny`, "Client certificate required".
//! 2. Certificate does not parse, or parses with an empty subject → `Deny`,
//!    "Invalid client certificate".
//! 3. Otherwise → `Allow` with the subject DN as principal and as
//!    `context.clientCertSubject`.
//!
//! Every decision is scoped to the request's resource identifier, unchanged.
//! [`evaluate`] is the pure procedure; [`decide`] wraps it with audit
//! records before and after.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::authorizer::audit::{AuditEvent, AuditSink, TracingAuditSink, sink_from_config};
use crate::authorizer::decision::{AuthorizationDecision, DenialReason};
use crate::authorizer::identity::parse_client_certificate;
use crate::authorizer::request::{GatewayAuthorizerEvent, RequestDescriptor};
use crate::config::AuditConfig;
use crate::error::CertificateError;

// ─────────────────────────────────────────────────────────────────────────────
// Pure procedure
// ─────────────────────────────────────────────────────────────────────────────

/// Decision plus the certificate error that caused a denial, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// The decision handed back to the gateway.
    pub decision: AuthorizationDecision,
    /// Parse failure behind an "Invalid client certificate" denial.
    pub certificate_error: Option<CertificateError>,
}

/// Decide `request` without side effects.
#[must_use]
pub fn evaluate(request: &RequestDescriptor) -> Evaluation {
    let resource = request.resource_identifier.as_str();

    let Some(pem) = request.presented_certificate() else {
        return Evaluation {
            decision: AuthorizationDecision::deny(DenialReason::CertificateRequired, resource),
            certificate_error: None,
        };
    };

    match parse_client_certificate(pem) {
        Ok(identity) => Evaluation {
            decision: AuthorizationDecision::allow(identity.subject_dn, resource),
            certificate_error: None,
        },
        Err(err) => Evaluation {
            decision: AuthorizationDecision::deny(DenialReason::InvalidCertificate, resource),
            certificate_error: Some(err),
        },
    }
}

/// Decide `request`, reporting input and output to `sink`.
///
/// Never fails: certificate problems become a `Deny`, sink failures are
/// logged and ignored.
pub fn decide(request: &RequestDescriptor, sink: &dyn AuditSink) -> AuthorizationDecision {
    decide_audited(request, None, sink)
}

fn decide_audited(
    request: &RequestDescriptor,
    gateway_event: Option<&GatewayAuthorizerEvent>,
    sink: &dyn AuditSink,
) -> AuthorizationDecision {
    emit(
        sink,
        &AuditEvent::Received {
            request,
            gateway_event,
        },
    );

    let Evaluation {
        decision,
        certificate_error,
    } = evaluate(request);

    let detail = certificate_error.as_ref().map(ToString::to_string);
    if let Some(ref detail) = detail {
        debug!(resource = %request.resource_identifier, error = %detail, "Client certificate rejected");
    }

    emit(
        sink,
        &AuditEvent::Decided {
            request,
            gateway_event,
            decision: &decision,
            detail: detail.as_deref(),
        },
    );

    decision
}

/// Hand `event` to `sink`, containing any failure.
fn emit(sink: &dyn AuditSink, event: &AuditEvent<'_>) {
    match catch_unwind(AssertUnwindSafe(|| sink.record(event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Audit sink failed; decision unaffected"),
        Err(_) => warn!("Audit sink panicked; decision unaffected"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorizer facade
// ─────────────────────────────────────────────────────────────────────────────

/// Decision engine bound to an audit sink.
///
/// Cheap to clone; share one instance across request handlers.
#[derive(Clone)]
pub struct Authorizer {
    sink: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer").finish_non_exhaustive()
    }
}

impl Default for Authorizer {
    fn default() -> Self {
        Self::new(Arc::new(TracingAuditSink::default()))
    }
}

impl Authorizer {
    /// Create an authorizer reporting to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Create an authorizer with the sink described by `config`.
    #[must_use]
    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(sink_from_config(config))
    }

    /// Decide a request descriptor.
    #[must_use]
    pub fn authorize(&self, request: &RequestDescriptor) -> AuthorizationDecision {
        decide(request, self.sink.as_ref())
    }

    /// Decide a gateway authorizer event.
    ///
    /// The event rides along in both audit records. The DN reported by the
    /// transport is only compared against the parsed one for diagnostics;
    /// the decision always uses the parsed DN.
    #[must_use]
    pub fn authorize_event(&self, event: &GatewayAuthorizerEvent) -> AuthorizationDecision {
        let decision = decide_audited(&event.to_descriptor(), Some(event), self.sink.as_ref());

        if let Some(reported) = event.client_cert().and_then(|c| c.subject_dn.as_deref()) {
            if decision.is_allowed() && reported != decision.principal_id {
                debug!(
                    reported = %reported,
                    parsed = %decision.principal_id,
                    "Transport subject DN differs from parsed certificate subject"
                );
            }
        }

        decision
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::authorizer::audit::NoopAuditSink;
    use crate::authorizer::decision::{DecisionContext, Effect};
    use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
    use std::sync::Mutex;

    const ARN: &str = "arn:aws:execute-api:us-east-1:123456789012:abcdef123/test/GET/hello";
    const SUBJECT: &str = "CN=test-client,O=Test Organization,C=US";

    fn client_pem() -> String {
        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CountryName, "US");
        dn.push(DnType::OrganizationName, "Test Organization");
        dn.push(DnType::CommonName, "test-client");
        params.distinguished_name = dn;
        let key = KeyPair::generate().unwrap();
        params.self_signed(&key).unwrap().pem()
    }

    // ── evaluate ─────────────────────────────────────────────────────────────

    #[test]
    fn evaluate_without_certificate_denies_as_required() {
        let eval = evaluate(&RequestDescriptor::new(ARN));
        assert_eq!(
            eval.decision.denial_reason(),
            Some(DenialReason::CertificateRequired)
        );
        assert!(eval.certificate_error.is_none());
    }

    #[test]
    fn evaluate_invalid_certificate_keeps_error_detail() {
        let eval = evaluate(&RequestDescriptor::new(ARN).with_certificate("invalid-cert"));
        assert_eq!(
            eval.decision.denial_reason(),
            Some(DenialReason::InvalidCertificate)
        );
        assert!(matches!(eval.certificate_error, Some(CertificateError::Pem(_))));
    }

    #[test]
    fn evaluate_valid_certificate_allows_subject() {
        let eval = evaluate(&RequestDescriptor::new(ARN).with_certificate(client_pem()));
        assert_eq!(eval.decision.effect(), Effect::Allow);
        assert_eq!(eval.decision.principal_id, SUBJECT);
        assert_eq!(
            eval.decision.context,
            DecisionContext::ClientCertSubject {
                client_cert_subject: SUBJECT.to_string()
            }
        );
    }

    // ── decide + sinks ───────────────────────────────────────────────────────

    #[test]
    fn decide_reports_request_then_decision() {
        // GIVEN: a sink capturing event kinds
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let sink = move |event: &AuditEvent<'_>| -> crate::Result<()> {
            let kind = match event {
                AuditEvent::Received { .. } => "received".to_string(),
                AuditEvent::Decided { decision, .. } => format!("decided:{}", decision.effect()),
            };
            captured.lock().unwrap().push(kind);
            Ok(())
        };
        // WHEN: deciding
        let decision = decide(&RequestDescriptor::new(ARN), &sink);
        // THEN: two records, in order
        assert_eq!(decision.effect(), Effect::Deny);
        assert_eq!(*seen.lock().unwrap(), vec!["received", "decided:Deny"]);
    }

    #[test]
    fn failing_sink_does_not_change_decision() {
        let failing = |_: &AuditEvent<'_>| -> crate::Result<()> {
            Err(Error::Audit("disk full".to_string()))
        };
        let request = RequestDescriptor::new(ARN).with_certificate(client_pem());
        assert_eq!(decide(&request, &failing), decide(&request, &NoopAuditSink));
    }

    #[test]
    fn panicking_sink_does_not_change_decision() {
        let panicking = |_: &AuditEvent<'_>| -> crate::Result<()> { panic!("sink exploded") };
        let request = RequestDescriptor::new(ARN).with_certificate("invalid-cert");
        let decision = decide(&request, &panicking);
        assert_eq!(
            decision.denial_reason(),
            Some(DenialReason::InvalidCertificate)
        );
    }

    #[test]
    fn decided_event_carries_detail_for_invalid_certificate() {
        let details = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&details);
        let sink = move |event: &AuditEvent<'_>| -> crate::Result<()> {
            if let AuditEvent::Decided { detail, .. } = event {
                captured.lock().unwrap().push(detail.map(str::to_owned));
            }
            Ok(())
        };
        decide(&RequestDescriptor::new(ARN).with_certificate("invalid-cert"), &sink);
        let details = details.lock().unwrap();
        assert_eq!(details.len(), 1);
        assert!(details[0].as_deref().is_some_and(|d| d.contains("PEM")));
    }

    // ── Authorizer ───────────────────────────────────────────────────────────

    #[test]
    fn authorize_event_ignores_reported_subject() {
        // GIVEN: transport claims a different subject than the certificate
        let event: GatewayAuthorizerEvent = serde_json::from_value(serde_json::json!({
            "methodArn": ARN,
            "requestContext": { "identity": { "clientCert": {
                "clientCertPem": client_pem(),
                "subjectDN": "CN=admin"
            }}}
        }))
        .unwrap();
        // WHEN: authorizing
        let decision = Authorizer::new(Arc::new(NoopAuditSink)).authorize_event(&event);
        // THEN: the parsed subject wins
        assert_eq!(decision.principal_id, SUBJECT);
    }

    #[test]
    fn authorize_event_audits_transport_fields() {
        // GIVEN: a sink keeping every record as JSON
        let records = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&records);
        let sink = move |event: &AuditEvent<'_>| -> crate::Result<()> {
            captured.lock().unwrap().push(serde_json::to_value(event)?);
            Ok(())
        };
        let event: GatewayAuthorizerEvent = serde_json::from_value(serde_json::json!({
            "type": "REQUEST",
            "methodArn": ARN,
            "requestContext": { "identity": {
                "sourceIp": "203.0.113.7",
                "clientCert": {
                    "clientCertPem": client_pem(),
                    "subjectDN": "CN=reported",
                    "serialNumber": "01"
                }
            }}
        }))
        .unwrap();

        // WHEN: authorizing the event
        let decision = Authorizer::new(Arc::new(sink)).authorize_event(&event);

        // THEN: both records carry what the transport reported
        assert_eq!(decision.principal_id, SUBJECT);
        let records = records.lock().unwrap();
        assert_eq!(records.len(), 2);
        for record in records.iter() {
            let identity = &record["gateway_event"]["requestContext"]["identity"];
            assert_eq!(identity["sourceIp"], "203.0.113.7");
            assert_eq!(identity["clientCert"]["subjectDN"], "CN=reported");
            assert_eq!(record["gateway_event"]["type"], "REQUEST");
        }
    }

    #[test]
    fn authorize_without_event_omits_gateway_event() {
        let records = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&records);
        let sink = move |event: &AuditEvent<'_>| -> crate::Result<()> {
            captured.lock().unwrap().push(serde_json::to_value(event)?);
            Ok(())
        };
        decide(&RequestDescriptor::new(ARN), &sink);
        assert!(
            records
                .lock()
                .unwrap()
                .iter()
                .all(|r| r.get("gateway_event").is_none())
        );
    }

    #[test]
    fn authorizer_from_disabled_config_still_decides() {
        let authorizer = Authorizer::from_config(&AuditConfig {
            enabled: false,
            redact_certificate: false,
        });
        let decision = authorizer.authorize(&RequestDescriptor::new(ARN));
        assert_eq!(decision.resource(), ARN);
    }
}
