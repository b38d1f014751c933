//! In-memory sink.
//!
//! Records every call in order. Useful for embedding the client and for
//! asserting on what a session delivered.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;

use crate::protocol::Descriptor;

use super::OutputSink;

// ============================================================================
// SinkEvent
// ============================================================================

/// One recorded sink call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// A `write` call.
    Write(Descriptor, String),
    /// An `open_link` call.
    OpenLink(String),
}

// ============================================================================
// MemorySink
// ============================================================================

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SinkEvent>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    /// Returns the concatenated text written to `descriptor`.
    #[must_use]
    pub fn text(&self, descriptor: Descriptor) -> String {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Write(d, text) if *d == descriptor => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Returns the links opened so far.
    #[must_use]
    pub fn links(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::OpenLink(uri) => Some(uri.clone()),
                SinkEvent::Write(..) => None,
            })
            .collect()
    }
}

impl OutputSink for MemorySink {
    fn write(&self, descriptor: Descriptor, text: &str) {
        self.events
            .lock()
            .push(SinkEvent::Write(descriptor, text.to_string()));
    }

    fn open_link(&self, uri: &str) {
        self.events.lock().push(SinkEvent::OpenLink(uri.to_string()));
    }
}

// ============================================================================
// Tests
// ============================================================================
