//! Trixie - command-line client for the Trixie remote command service.
//!
//! Runs one namespaced action on a remote host and streams its output back
//! to the terminal as it is produced.
//!
//! # Architecture
//!
//! Each command gets its own WebSocket session:
//!
//! - **Client (Rust)**: authenticates, sends one command, prints output
//! - **Service**: runs the command, streams output lines, sends a completion code
//!
//! Key design principles:
//!
//! - Each [`Session`] owns one connection and runs exactly one command
//! - A single reader task owns the session state and publishes it
//! - All socket writes go through one writer task
//! - Output reaches the terminal through an [`OutputSink`], never directly
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use trixie::{MemorySink, Result, Session, SessionOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let sink = Arc::new(MemorySink::new());
//!     let mut session = Session::open(
//!         "https://trixie.example.net",
//!         sink.clone(),
//!         SessionOptions::default(),
//!     )
//!     .await?;
//!
//!     let code = session.run_command("token", "vm.list", &[]).await?;
//!     session.close().await;
//!
//!     println!("{} exited with {code}", sink.events().len());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cli`] | Command line, binary-name sniffing, link installer |
//! | [`client`] | HTTP API and action dispatch |
//! | [`config`] | `~/.Trixie.json` persistence |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`output`] | Output sinks |
//! | [`protocol`] | Wire frames and codec |
//! | [`transport`] | WebSocket session |

// ============================================================================
// Modules
// ============================================================================

/// Command-line surface.
pub mod cli;

/// HTTP API client and action dispatch.
pub mod client;

/// Local configuration file.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Output sinks for streamed command output.
pub mod output;

/// Wire frames exchanged with the service.
pub mod protocol;

/// WebSocket session and its tasks.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// CLI types
pub use cli::{Cli, Invocation, Linker};

// Client types
pub use client::{ApiClient, AuthGrant, CredentialSource, Executor, RemoteResponse, Transport};

// Config types
pub use config::Config;

// Error types
pub use error::{Error, Result};

// Output types
pub use output::{ConsoleSink, MemorySink, OutputSink, SharedSink, SinkEvent};

// Protocol types
pub use protocol::{ClientFrame, Descriptor, FrameKind, OutputLine, ServerFrame};

// Transport types
pub use transport::{InterruptHandle, Session, SessionOptions, SessionState};
