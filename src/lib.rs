//! mTLS Authorizer Library
//!
//! Request authorizer that turns a client-presented mutual-TLS certificate
//! into a resource-scoped allow/deny policy for an API gateway.
//!
//! # Features
//!
//! - **Decision engine**: pure, total `decide` over a typed request descriptor
//! - **Identity**: X.509 subject DN in RFC 4514 form as the principal
//! - **Audit**: pluggable sinks recording input and output of every decision
//! - **HTTP adapter**: `POST /authorize` for gateways that call out over HTTP
//!
//! # Output contract
//!
//! Decisions serialize to the gateway's policy shape (`principalId`,
//! `policyDocument` with version `2012-10-17` and action
//! `execute-api:Invoke`, `context`); see [`authorizer::decision`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authorizer;
pub mod cli;
pub mod config;
pub mod error;
pub mod server;

pub use authorizer::{AuthorizationDecision, Authorizer, RequestDescriptor, decide};
pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// # Errors
///
/// Returns `Error::Internal` if a global subscriber is already installed.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    }
    .map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {e}")))
}
