//! Certificate-based request authorization.
//!
//! # Flow
//!
//! ```text
//! gateway authorizer event
//!   → RequestDescriptor       (resource identifier + optional PEM)
//!   → CertIdentity            (x509-parser, RFC 4514 subject DN)
//!   → AuthorizationDecision   (Allow/Deny policy scoped to the resource)
//!   → AuditSink               (before and after, never affects the outcome)
//! ```
//!
//! # Modules
//!
//! - [`request`]: input types and gateway event flattening
//! - [`identity`]: PEM/X.509 parsing and DN rendering (`CertIdentity`)
//! - [`decision`]: output types (`AuthorizationDecision`, `Effect`, `DenialReason`)
//! - [`audit`]: observability sinks (`AuditSink`, `TracingAuditSink`)
//! - [`engine`]: the decision procedure (`decide`, `Authorizer`)

pub mod audit;
pub mod decision;
pub mod engine;
pub mod identity;
pub mod request;

pub use audit::{AuditEvent, AuditSink, NoopAuditSink, TracingAuditSink};
pub use decision::{
    AuthorizationDecision, DecisionContext, DenialReason, Effect, PolicyDocument, Statement,
};
pub use engine::{Authorizer, Evaluation, decide, evaluate};
pub use identity::{CertIdentity, parse_client_certificate};
pub use request::{GatewayAuthorizerEvent, RequestDescriptor};
