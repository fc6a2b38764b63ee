//! HTTP adapter.
//!
//! For gateways that call the authorizer over HTTP instead of in-process:
//!
//! | Route | Body | Response |
//! |-------|------|----------|
//! | `POST /authorize` | gateway authorizer event JSON | decision JSON |
//! | `GET /health` | (none) | `{"status":"ok","version":...}` |
//!
//! Allow and Deny both answer `200`; the gateway reads the effect from the
//! policy. Only malformed request bodies are rejected at the HTTP level.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::authorizer::{AuthorizationDecision, Authorizer, GatewayAuthorizerEvent};
use crate::config::ServerConfig;
use crate::{Error, Result};

/// Build the router.
pub fn create_router(authorizer: Arc<Authorizer>) -> Router {
    Router::new()
        .route("/authorize", post(authorize))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(authorizer)
}

/// `POST /authorize`
async fn authorize(
    State(authorizer): State<Arc<Authorizer>>,
    Json(event): Json<GatewayAuthorizerEvent>,
) -> Json<AuthorizationDecision> {
    Json(authorizer.authorize_event(&event))
}

/// `GET /health`
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Bind `config.host:config.port` and serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the address is invalid or cannot be bound.
pub async fn serve(config: &ServerConfig, authorizer: Authorizer) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| Error::Config(format!("Invalid listen address: {e}")))?;

    let listener = TcpListener::bind(addr).await?;
    info!(host = %config.host, port = config.port, "Listening");
    info!("  POST http://{addr}/authorize");

    axum::serve(listener, create_router(Arc::new(authorizer)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Internal(e.to_string()))
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorizer::NoopAuditSink;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn router() -> Router {
        create_router(Arc::new(Authorizer::new(Arc::new(NoopAuditSink))))
    }

    #[tokio::test]
    async fn health_reports_version() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn invalid_listen_address_is_config_error() {
        let config = ServerConfig {
            host: "not a host".to_string(),
            port: 1,
        };
        let err = serve(&config, Authorizer::default()).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
