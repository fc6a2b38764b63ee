//! mTLS Authorizer - certificate-based allow/deny decisions for an API gateway.

use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use mtls_authorizer::{
    Result,
    authorizer::{Authorizer, GatewayAuthorizerEvent},
    cli::{Cli, Command},
    config::Config,
    server, setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // CLI overrides
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    if cli.log_format.is_some() {
        config.log.format = cli.log_format;
    }

    if let Err(e) = setup_tracing(&config.log.level, config.log.format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let authorizer = Authorizer::from_config(&config.audit);

    match cli.command {
        Some(Command::Decide { event }) => run_decide(&authorizer, event.as_deref()),
        Some(Command::Serve { port, host }) => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            run_server(config, authorizer).await
        }
        None => run_server(config, authorizer).await,
    }
}

/// Decide one event and print the policy
fn run_decide(authorizer: &Authorizer, path: Option<&Path>) -> ExitCode {
    let event = match read_event(path) {
        Ok(event) => event,
        Err(e) => {
            eprintln!("Failed to read authorizer event: {e}");
            return ExitCode::FAILURE;
        }
    };

    let decision = authorizer.authorize_event(&event);
    match serde_json::to_string_pretty(&decision) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to serialize decision: {e}");
            ExitCode::FAILURE
        }
    }
}

fn read_event(path: Option<&Path>) -> Result<GatewayAuthorizerEvent> {
    let text = match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)?,
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    Ok(serde_json::from_str(&text)?)
}

/// Run the HTTP adapter
async fn run_server(config: Config, authorizer: Authorizer) -> ExitCode {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        audit = config.audit.enabled,
        "Starting mTLS authorizer"
    );

    if let Err(e) = server::serve(&config.server, authorizer).await {
        error!("Authorizer error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Authorizer shutdown complete");
    ExitCode::SUCCESS
}
