//! Launcher binary for the Turnstile auth broker (§6): a thin process
//! wrapper around `turnstile-server::run` that owns exit-code semantics.
//!
//! Exit codes: 0 normal shutdown, 1 fatal config error, 2 database
//! unreachable at startup.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use turnstile_server::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "turnstile", version, about = "Turnstile QR+PIN authentication broker")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run pending migrations against `TURNSTILE_DATABASE_URL` and exit.
    Migrate,
    /// Run the HTTP/WebSocket server until killed.
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();

    let cfg = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::error!(error = %err, "fatal config error");
            return ExitCode::from(1);
        }
    };

    match cli.cmd {
        Command::Migrate => match turnstile_store::connect(&cfg.database_url, 1).await {
            Ok(_) => {
                tracing::info!("migrations applied");
                ExitCode::SUCCESS
            }
            Err(err) => {
                tracing::error!(error = %err, "database unreachable");
                ExitCode::from(2)
            }
        },
        Command::Serve => match turnstile_server::run(cfg).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                tracing::error!(error = %err, "database unreachable at startup");
                ExitCode::from(2)
            }
        },
    }
}
