//! WebSocket protocol message types.
//!
//! This module defines the frames exchanged between the client and the
//! Trixie service over the streaming session.
//!
//! # Protocol Overview
//!
//! | Frame | Direction | Purpose |
//! |-------|-----------|---------|
//! | [`ClientFrame::Auth`] | Client → Server | Present the auth token |
//! | [`ClientFrame::Do`] | Client → Server | Run `namespace.command` with params |
//! | [`ServerFrame`] | Server → Client | Auth ack, output line, or completion |
//!
//! Server frames share one shape with optional fields. The receiver decides
//! what a frame means from which fields are set, in this order:
//! auth ack, completion code, finished flag, plain output line.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Stateless encode/decode functions |
//! | `inbound` | Server frame schema and classification |
//! | `outbound` | Client frame schema |

// ============================================================================
// Submodules
// ============================================================================

/// Stateless frame encode/decode.
pub mod codec;

/// Server → client frames.
pub mod inbound;

/// Client → server frames.
pub mod outbound;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{decode, encode};
pub use inbound::{Descriptor, FrameKind, OutputLine, ServerFrame, LINK_MARKER};
pub use outbound::ClientFrame;
