//! Stateless frame encode/decode.
//!
//! Frames travel as WebSocket text messages holding one JSON object each.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{from_str, to_string};

use crate::error::{Error, Result};

use super::{ClientFrame, ServerFrame};

// ============================================================================
// Functions
// ============================================================================

/// Encodes a client frame as JSON text.
///
/// # Errors
///
/// Returns [`Error::Json`] if serialization fails.
#[inline]
pub fn encode(frame: &ClientFrame) -> Result<String> {
    Ok(to_string(frame)?)
}

/// Decodes a server frame from JSON text.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the text is not a valid server frame.
#[inline]
pub fn decode(text: &str) -> Result<ServerFrame> {
    from_str(text).map_err(|e| Error::decode(e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================
