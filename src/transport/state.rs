//! Session lifecycle state.
//!
//! ```text
//! Connecting → Connected → Authenticated → CommandSent → Streaming → Finished
//!                                                                      ↓
//!                                                      ClosedNormal | ClosedError
//! ```
//!
//! Any state may jump to `ClosedError` on a transport failure. The reader
//! task is the only writer; everyone else observes through a
//! `tokio::sync::watch` receiver.

// ============================================================================
// SessionState
// ============================================================================

/// Lifecycle state of a [`Session`](super::Session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Dialing. Never observed on an open session.
    #[default]
    Connecting,
    /// Socket open, nothing sent yet.
    Connected,
    /// Server acknowledged the auth frame.
    Authenticated,
    /// Command frame written.
    CommandSent,
    /// Output is arriving.
    Streaming,
    /// A completion frame arrived.
    Finished {
        /// Delivered completion code.
        code: u8,
    },
    /// Socket closed cleanly.
    ClosedNormal,
    /// Socket closed because of a transport, decode or write failure.
    ClosedError,
}

impl SessionState {
    /// Returns `true` once the socket is gone.
    #[inline]
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::ClosedNormal | Self::ClosedError)
    }

    /// Returns `true` after the auth ack and before completion.
    #[inline]
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(
            self,
            Self::Authenticated | Self::CommandSent | Self::Streaming
        )
    }

    /// Returns `true` if no command can make progress any more.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished { .. }) || self.is_closed()
    }

    /// Returns the completion code if the command finished.
    #[inline]
    #[must_use]
    pub const fn code(self) -> Option<u8> {
        match self {
            Self::Finished { code } => Some(code),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
