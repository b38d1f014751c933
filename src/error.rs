//! Error types for the Trixie client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use trixie::{Result, Session, SessionOptions, SharedSink};
//!
//! async fn example(sink: SharedSink) -> Result<u8> {
//!     let mut session = Session::open("https://trixie.example", sink, SessionOptions::default()).await?;
//!     session.run_command("token", "vm.list", &[]).await
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Session | [`Error::Dial`], [`Error::AuthTimeout`], [`Error::Decode`], [`Error::Transport`], [`Error::ConnectionClosed`], [`Error::Interrupted`], [`Error::SessionSpent`] |
//! | HTTP API | [`Error::Http`], [`Error::LoginFailed`], [`Error::RenewFailed`], [`Error::CredentialsBlank`] |
//! | Local commands | [`Error::UnknownCommand`], [`Error::InvalidArgument`], [`Error::Link`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::Pattern`] |
//!
//! A non-zero completion code from the server is not an error: it is returned
//! as the command's code and becomes the process exit status.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the config file or server address is unusable.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// The WebSocket could not be established.
    #[error("Cannot connect to {address}: {message}")]
    Dial {
        /// Address that was dialed.
        address: String,
        /// Underlying failure.
        message: String,
    },

    /// The server never acknowledged the auth frame.
    #[error("Authentication not acknowledged after {timeout_ms}ms")]
    AuthTimeout {
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
    },

    /// An inbound frame could not be decoded.
    #[error("Malformed frame from server: {message}")]
    Decode {
        /// Decoder error message.
        message: String,
    },

    /// A read or write on the socket failed mid-session.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
    },

    /// The connection closed before the command completed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The session was torn down by a process interrupt.
    #[error("Interrupted")]
    Interrupted,

    /// A command was already issued on this session.
    #[error("Session already used for a command")]
    SessionSpent,

    // ========================================================================
    // HTTP API Errors
    // ========================================================================
    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// `/auth` rejected the supplied credentials.
    #[error("login failed")]
    LoginFailed,

    /// `/auth/<validity>` rejected the stored token.
    #[error("renewal failed (status {status})")]
    RenewFailed {
        /// HTTP status returned by the server.
        status: u16,
    },

    /// Username or password was empty.
    #[error("username or password blank")]
    CredentialsBlank,

    // ========================================================================
    // Local Command Errors
    // ========================================================================
    /// Action not known to the local dispatcher.
    #[error("unknown command: {command}")]
    UnknownCommand {
        /// The unrecognized action.
        command: String,
    },

    /// Arguments missing or malformed for a local command.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// Link installer could not derive a prefix from the binary name.
    #[error("Cannot create links: {message}")]
    Link {
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Name pattern failed to compile.
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a dial failure.
    #[inline]
    pub fn dial(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Dial {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Creates an auth timeout error.
    #[inline]
    pub fn auth_timeout(timeout_ms: u64) -> Self {
        Self::AuthTimeout { timeout_ms }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an unknown command error.
    #[inline]
    pub fn unknown_command(command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a link installer error.
    #[inline]
    pub fn link(message: impl Into<String>) -> Self {
        Self::Link {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::AuthTimeout { .. })
    }

    /// Returns `true` if the session's connection failed or was lost.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Dial { .. } | Self::Transport { .. } | Self::ConnectionClosed
        )
    }

    /// Returns `true` if this error came from the streaming session.
    #[inline]
    #[must_use]
    pub fn is_session_error(&self) -> bool {
        self.is_connection_error()
            || matches!(
                self,
                Self::AuthTimeout { .. }
                    | Self::Decode { .. }
                    | Self::Interrupted
                    | Self::SessionSpent
            )
    }
}

// ============================================================================
// Tests
// ============================================================================
