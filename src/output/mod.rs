//! Output sinks.
//!
//! The session never touches the terminal itself. Every output line and
//! every link it receives is handed to an [`OutputSink`], in arrival order,
//! from the reader task.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConsoleSink`] | Writes to the process stdout/stderr, opens links with the OS |
//! | [`MemorySink`] | Records everything it receives |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::protocol::{Descriptor, OutputLine};

// ============================================================================
// Submodules
// ============================================================================

/// Terminal sink.
pub mod console;

/// OS handler for links.
pub mod launcher;

/// In-memory sink.
pub mod memory;

// ============================================================================
// Re-exports
// ============================================================================

pub use console::ConsoleSink;
pub use memory::{MemorySink, SinkEvent};

// ============================================================================
// OutputSink
// ============================================================================

/// Receives streamed command output.
///
/// Called from the reader task; implementations must not block for long.
pub trait OutputSink: Send + Sync {
    /// Writes text to the given stream. The text is not newline-terminated
    /// by the caller.
    fn write(&self, descriptor: Descriptor, text: &str);

    /// Opens a link the server asked the user to follow.
    fn open_link(&self, uri: &str);

    /// Routes a classified output line.
    fn dispatch(&self, line: &OutputLine) {
        match line {
            OutputLine::Write { descriptor, text } => self.write(*descriptor, text),
            OutputLine::OpenLink { uri } => self.open_link(uri),
            OutputLine::Discard => {}
        }
    }
}

/// Sink shared between the caller and the reader task.
pub type SharedSink = Arc<dyn OutputSink>;
