//! Audit sinks.
//!
//! The decision engine reports what it saw and what it decided through an
//! [`AuditSink`]. Sinks are fire-and-forget: a sink error is logged and
//! dropped, it never changes a decision.

use serde::Serialize;
use tracing::info;

use crate::Result;
use crate::authorizer::decision::AuthorizationDecision;
use crate::authorizer::request::{GatewayAuthorizerEvent, RequestDescriptor};
use crate::config::AuditConfig;

/// `tracing` target every audit record is emitted on.
pub const AUDIT_TARGET: &str = "mtls_authorizer::audit";

/// One audit record.
///
/// `gateway_event` is the untouched gateway event when the request came in
/// as one, so transport-reported fields (`sourceIp`, `subjectDN`, validity)
/// are logged even though the decision ignores them.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent<'a> {
    /// A request arrived; emitted before any parsing.
    Received {
        /// Full engine input.
        request: &'a RequestDescriptor,
        /// Gateway event the input was flattened from.
        #[serde(skip_serializing_if = "Option::is_none")]
        gateway_event: Option<&'a GatewayAuthorizerEvent>,
    },
    /// A decision was produced.
    Decided {
        /// Full engine input.
        request: &'a RequestDescriptor,
        /// Gateway event the input was flattened from.
        #[serde(skip_serializing_if = "Option::is_none")]
        gateway_event: Option<&'a GatewayAuthorizerEvent>,
        /// Full engine output.
        decision: &'a AuthorizationDecision,
        /// Why the certificate was rejected, when it was.
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<&'a str>,
    },
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Record one event.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the engine logs and ignores the error.
    fn record(&self, event: &AuditEvent<'_>) -> Result<()>;
}

impl<F> AuditSink for F
where
    F: Fn(&AuditEvent<'_>) -> Result<()> + Send + Sync,
{
    fn record(&self, event: &AuditEvent<'_>) -> Result<()> {
        self(event)
    }
}

/// Build the sink described by `config`.
pub fn sink_from_config(config: &AuditConfig) -> std::sync::Arc<dyn AuditSink> {
    if config.enabled {
        std::sync::Arc::new(TracingAuditSink::new(config.redact_certificate))
    } else {
        std::sync::Arc::new(NoopAuditSink)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sinks
// ─────────────────────────────────────────────────────────────────────────────

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent<'_>) -> Result<()> {
        Ok(())
    }
}

/// Emits each record as a JSON payload on the [`AUDIT_TARGET`] tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink {
    redact_certificate: bool,
}

impl TracingAuditSink {
    /// Create a sink; with `redact_certificate` the PEM body is replaced by
    /// its length in emitted records, in the descriptor and the gateway
    /// event alike.
    #[must_use]
    pub const fn new(redact_certificate: bool) -> Self {
        Self { redact_certificate }
    }

    fn render(&self, event: &AuditEvent<'_>) -> Result<String> {
        if !self.redact_certificate {
            return Ok(serde_json::to_string(event)?);
        }

        let redacted = match *event {
            AuditEvent::Received {
                request,
                gateway_event,
            } => {
                let request = redact(request);
                let gateway_event = gateway_event.map(redact_event);
                serde_json::to_string(&AuditEvent::Received {
                    request: &request,
                    gateway_event: gateway_event.as_ref(),
                })?
            }
            AuditEvent::Decided {
                request,
                gateway_event,
                decision,
                detail,
            } => {
                let request = redact(request);
                let gateway_event = gateway_event.map(redact_event);
                serde_json::to_string(&AuditEvent::Decided {
                    request: &request,
                    gateway_event: gateway_event.as_ref(),
                    decision,
                    detail,
                })?
            }
        };
        Ok(redacted)
    }
}

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent<'_>) -> Result<()> {
        let payload = self.render(event)?;
        match event {
            AuditEvent::Received { request, .. } => info!(
                target: AUDIT_TARGET,
                resource = %request.resource_identifier,
                has_certificate = request.raw_client_certificate.is_some(),
                payload = %payload,
                "Authorizer request"
            ),
            AuditEvent::Decided {
                request, decision, ..
            } => info!(
                target: AUDIT_TARGET,
                resource = %request.resource_identifier,
                principal = %decision.principal_id,
                effect = %decision.effect(),
                payload = %payload,
                "Authorizer response"
            ),
        }
        Ok(())
    }
}

fn redact(request: &RequestDescriptor) -> RequestDescriptor {
    RequestDescriptor {
        resource_identifier: request.resource_identifier.clone(),
        raw_client_certificate: request.raw_client_certificate.as_deref().map(redact_pem),
    }
}

fn redact_event(event: &GatewayAuthorizerEvent) -> GatewayAuthorizerEvent {
    let mut event = event.clone();
    if let Some(cert) = event
        .request_context
        .as_mut()
        .and_then(|ctx| ctx.identity.as_mut())
        .and_then(|identity| identity.client_cert.as_mut())
    {
        cert.client_cert_pem = cert.client_cert_pem.as_deref().map(redact_pem);
    }
    event
}

fn redact_pem(pem: &str) -> String {
    format!("<redacted: {} bytes>", pem.len())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
