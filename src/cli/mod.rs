//! Command-line surface.
//!
//! ```text
//! trixie [--config PATH] [--http] [ACTION [PARAMS...]]
//! t_vm list
//! trixie createlink vm dns
//! ```
//!
//! Everything after the action is passed to the remote action verbatim,
//! including arguments that look like flags.

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use tracing::debug;

use crate::client::{Executor, Transport};
use crate::config::{CONFIG_FILE_NAME, Config};
use crate::error::Result;
use crate::output::ConsoleSink;

// ============================================================================
// Submodules
// ============================================================================

/// Binary-name sniffing.
pub mod invocation;

/// Namespace link installer.
pub mod links;

// ============================================================================
// Re-exports
// ============================================================================

pub use invocation::{INTERNAL_NAMESPACE, Invocation};
pub use links::Linker;

// ============================================================================
// Constants
// ============================================================================

/// Action run when none is given.
pub const DEFAULT_ACTION: &str = "help";

// ============================================================================
// Cli
// ============================================================================

/// Runs actions on the Trixie service.
#[derive(Debug, Parser)]
#[command(name = "trixie", disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Config file (default: ~/.Trixie.json)
    #[arg(long, env = "TRIXIE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Send the action as one HTTP request instead of streaming it
    #[arg(long)]
    pub http: bool,

    /// Action followed by its parameters
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ACTION")]
    pub args: Vec<String>,
}

impl Cli {
    /// The action, or [`DEFAULT_ACTION`].
    #[must_use]
    pub fn action(&self) -> &str {
        self.args.first().map_or(DEFAULT_ACTION, String::as_str)
    }

    /// Parameters following the action.
    #[must_use]
    pub fn params(&self) -> &[String] {
        self.args.get(1..).unwrap_or_default()
    }

    fn transport(&self) -> Transport {
        if self.http {
            Transport::Http
        } else {
            Transport::Stream
        }
    }
}

// ============================================================================
// Entry
// ============================================================================

/// Runs the parsed command line as `argv0` and returns the exit code.
pub async fn run(cli: Cli, argv0: &str) -> Result<u8> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };

    if Config::ensure_exists(&path)? {
        eprintln!("{CONFIG_FILE_NAME} does not exist. Creating a default config for you");
    }
    let config = Config::load(&path)?;
    debug!(path = %path.display(), url = %config.url, "Config loaded");

    let invocation = Invocation::detect(argv0)?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());
    if config.is_expired(now) {
        eprintln!(
            "Your auth-token is expired. Please renew with '{} login'",
            invocation.binary_name
        );
    }

    let mut executor = Executor::new(config, path, invocation, Arc::new(ConsoleSink::new()))?
        .with_transport(cli.transport());

    executor.execute(cli.action(), cli.params()).await
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("parse")
    }

    #[test]
    fn test_defaults_to_help() {
        let cli = parse(&["trixie"]);
        assert_eq!(cli.action(), DEFAULT_ACTION);
        assert!(cli.params().is_empty());
        assert!(!cli.http);
    }

    #[test]
    fn test_action_and_params() {
        let cli = parse(&["t_vm", "restart", "web01", "web02"]);
        assert_eq!(cli.action(), "restart");
        assert_eq!(cli.params(), ["web01", "web02"]);
    }

    #[test]
    fn test_help_flag_is_an_action() {
        assert_eq!(parse(&["trixie", "--help"]).action(), "--help");
        assert_eq!(parse(&["trixie", "-h"]).action(), "-h");
    }

    #[test]
    fn test_flags_after_action_are_params() {
        let cli = parse(&["t_vm", "create", "--size", "large", "--http"]);
        assert_eq!(cli.action(), "create");
        assert_eq!(cli.params(), ["--size", "large", "--http"]);
        assert!(!cli.http);
    }

    #[test]
    fn test_leading_options() {
        let cli = parse(&["trixie", "--http", "--config", "/tmp/t.json", "info"]);
        assert!(cli.http);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/t.json")));
        assert_eq!(cli.action(), "info");
    }
}
