//! Terminal sink.

// ============================================================================
// Imports
// ============================================================================

use std::io::{self, Write};

use tracing::{debug, warn};

use crate::protocol::Descriptor;

use super::OutputSink;
use super::launcher;

// ============================================================================
// ConsoleSink
// ============================================================================

/// Writes output to the process's stdout/stderr and opens links with the OS.
///
/// Text is written exactly as received and flushed per line, so interleaved
/// stdout/stderr output keeps the server's ordering on a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ConsoleSink {
    /// Creates a console sink.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl OutputSink for ConsoleSink {
    fn write(&self, descriptor: Descriptor, text: &str) {
        let result = match descriptor {
            Descriptor::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(text.as_bytes()).and_then(|()| out.flush())
            }
            Descriptor::Stderr => {
                let mut err = io::stderr().lock();
                err.write_all(text.as_bytes()).and_then(|()| err.flush())
            }
        };

        if let Err(e) = result {
            debug!(?descriptor, error = %e, "Console write failed");
        }
    }

    fn open_link(&self, uri: &str) {
        if let Err(e) = launcher::open_uri(uri) {
            warn!(uri, error = %e, "Failed to launch link handler");
        }

        println!(
            "Opened VMRC. If it does not open after a few seconds, make sure you installed \
             VMware Remote Console.\nURI used:\n{uri}"
        );
    }
}
