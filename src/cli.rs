//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// mTLS request authorizer - certificate subject in, gateway policy out
#[derive(Parser, Debug)]
#[command(name = "mtls-authorizer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "MTLS_AUTHORIZER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MTLS_AUTHORIZER_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long, env = "MTLS_AUTHORIZER_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve `POST /authorize` over HTTP (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "MTLS_AUTHORIZER_PORT")]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, env = "MTLS_AUTHORIZER_HOST")]
        host: Option<String>,
    },

    /// Decide a single authorizer event and print the policy as JSON
    Decide {
        /// Event JSON file; reads stdin when omitted or `-`
        #[arg(short, long)]
        event: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_parses() {
        let cli = Cli::try_parse_from(["mtls-authorizer"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn decide_accepts_event_path() {
        let cli =
            Cli::try_parse_from(["mtls-authorizer", "decide", "--event", "event.json"]).unwrap();
        match cli.command {
            Some(Command::Decide { event }) => {
                assert_eq!(event, Some(PathBuf::from("event.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn serve_accepts_overrides() {
        let cli = Cli::try_parse_from([
            "mtls-authorizer",
            "--log-format",
            "json",
            "serve",
            "--port",
            "8443",
        ])
        .unwrap();
        assert_eq!(cli.log_format.as_deref(), Some("json"));
        assert!(matches!(
            cli.command,
            Some(Command::Serve {
                port: Some(8443),
                ..
            })
        ));
    }
}
