//! Service client: HTTP API and action dispatch.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ApiClient`] | Login, token renewal and non-streamed actions |
//! | [`Executor`] | Maps command-line actions to local or remote commands |

// ============================================================================
// Submodules
// ============================================================================

/// Banner for `help` and `info`.
pub mod banner;

/// Action dispatch.
pub mod executor;

/// HTTP endpoints.
pub mod http;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use executor::{CredentialSource, Executor, TerminalPrompt, Transport};
pub use http::{ApiClient, AuthGrant, RemoteLine, RemoteResponse};
