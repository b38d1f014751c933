//! WebSocket transport layer.
//!
//! This module runs the streaming command session against the Trixie
//! service.
//!
//! # Architecture
//!
//! ```text
//!                ┌──────────────┐   frames    ┌────────────┐
//!  run_command ─►│ Writer task  │────────────►│            │
//!                └──────────────┘             │            │
//!                       ▲ ping/close          │   Trixie   │
//!                ┌──────┴───────┐             │  service   │
//!   Ctrl-C ─────►│ Heartbeat    │             │            │
//!                └──────────────┘             │            │
//!                ┌──────────────┐   frames    │            │
//!  OutputSink ◄──│ Reader task  │◄────────────│            │
//!                └──────────────┘             └────────────┘
//! ```
//!
//! The reader task is the only writer of [`SessionState`]. The writer task
//! is the only writer of the socket.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `session` | Public session API |
//! | `state` | Lifecycle state |
//! | `reader` | Inbound frame loop |
//! | `writer` | Serialized outbound frames |
//! | `heartbeat` | Keepalive pings and interrupt handling |

// ============================================================================
// Imports
// ============================================================================

use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

// ============================================================================
// Submodules
// ============================================================================

/// Keepalive pings and interrupt handling.
pub mod heartbeat;

/// Inbound frame loop.
pub(crate) mod reader;

/// Public session API.
pub mod session;

/// Lifecycle state.
pub mod state;

/// Serialized outbound frames.
pub(crate) mod writer;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Types
// ============================================================================

/// Client WebSocket stream, plain or TLS.
pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// Re-exports
// ============================================================================

pub use heartbeat::InterruptHandle;
pub use session::{
    DEFAULT_AUTH_TIMEOUT, DEFAULT_CLOSE_TIMEOUT, DEFAULT_HEARTBEAT_INTERVAL, Session,
    SessionOptions, ws_url,
};
pub use state::SessionState;
