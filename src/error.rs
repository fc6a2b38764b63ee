//! Error types for the mTLS authorizer

use std::io;

use thiserror::Error;

/// Result type alias for the mTLS authorizer
pub type Result<T> = std::result::Result<T, Error>;

/// mTLS authorizer errors
///
/// None of these ever reach a gateway as an authorization failure: the
/// decision engine folds certificate problems into a `Deny` and swallows
/// audit failures. They surface from configuration loading, the CLI and
/// the HTTP listener.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audit sink failed to record an event
    #[error("Audit error: {0}")]
    Audit(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Reasons a presented client certificate was rejected.
///
/// All variants collapse into the same `"Invalid client certificate"`
/// denial; the distinction exists for audit logs only. They never convert
/// into [`Error`]: the engine has no failure path for them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CertificateError {
    /// The payload is not PEM framed.
    #[error("malformed PEM: {0}")]
    Pem(String),

    /// The first PEM block is something other than a certificate.
    #[error("unexpected PEM label '{0}', expected 'CERTIFICATE'")]
    UnexpectedLabel(String),

    /// The PEM contents are not a DER-encoded X.509 certificate.
    #[error("malformed X.509 certificate: {0}")]
    Der(String),

    /// The certificate parsed but carries no subject name.
    #[error("certificate subject is empty")]
    EmptySubject,
}
