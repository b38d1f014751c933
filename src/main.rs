//! `trixie` binary.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use trixie::cli::{self, Cli};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "TRIXIE_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let argv0 = std::env::args().next().unwrap_or_else(|| "trixie".to_string());
    let cli = Cli::parse();

    match cli::run(cli, &argv0).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
