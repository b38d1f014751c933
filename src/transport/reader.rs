//! Reader task.
//!
//! Reads frames for the whole session lifetime and is the only writer of
//! [`SessionState`]. Per frame it either marks the session authenticated,
//! delivers the completion code, or hands an output line to the sink.
//!
//! Other tasks talk to the reader through [`ReaderSignal`]s rather than
//! touching state themselves. Signals are always handled before frames that
//! are ready at the same time.
//!
//! State is published before the completion channel is resolved, so a
//! caller woken by the completion always sees the final state.

// ============================================================================
// Imports
// ============================================================================

use futures_util::StreamExt;
use futures_util::stream::SplitStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::output::SharedSink;
use crate::protocol::{FrameKind, ServerFrame, codec};

use super::WsStream;
use super::state::SessionState;

// ============================================================================
// Types
// ============================================================================

/// Read half of the session socket.
pub(crate) type WsSource = SplitStream<WsStream>;

/// Single-consumer channel carrying the command's outcome.
pub(crate) type CompletionTx = oneshot::Sender<Result<u8>>;

/// Messages to the reader from the other session tasks.
#[derive(Debug)]
pub(crate) enum ReaderSignal {
    /// The caller wrote the command frame.
    CommandSent,
    /// A write failed; the session is dead.
    Fault(Error),
    /// A process interrupt started the close handshake.
    Interrupted,
    /// Stop reading now.
    ForceClose,
}

/// Why the read loop stopped.
enum Exit {
    Closed,
    Failed(Error),
}

// ============================================================================
// Reader
// ============================================================================

/// State owned by the reader task.
pub(crate) struct Reader {
    source: WsSource,
    signals: mpsc::UnboundedReceiver<ReaderSignal>,
    state: watch::Sender<SessionState>,
    completion: Option<CompletionTx>,
    sink: SharedSink,
    interrupted: bool,
}

impl Reader {
    /// Creates the reader. Call [`run`](Self::run) on a spawned task.
    pub(crate) fn new(
        source: WsSource,
        signals: mpsc::UnboundedReceiver<ReaderSignal>,
        state: watch::Sender<SessionState>,
        completion: CompletionTx,
        sink: SharedSink,
    ) -> Self {
        Self {
            source,
            signals,
            state,
            completion: Some(completion),
            sink,
            interrupted: false,
        }
    }

    /// Reads until the socket closes or fails.
    pub(crate) async fn run(mut self) {
        let exit = self.read_loop().await;

        match exit {
            Exit::Closed => {
                let pending = if self.interrupted {
                    Error::Interrupted
                } else {
                    Error::ConnectionClosed
                };
                self.state.send_replace(SessionState::ClosedNormal);
                self.fail_pending(pending);
                info!("Session closed");
            }
            Exit::Failed(e) => {
                if e.is_connection_error() {
                    warn!(error = %e, "Session connection lost");
                } else {
                    error!(error = %e, "Session failed");
                }
                self.state.send_replace(SessionState::ClosedError);
                self.fail_pending(e);
            }
        }

        debug!("Reader task terminated");
    }

    async fn read_loop(&mut self) -> Exit {
        loop {
            tokio::select! {
                biased;

                signal = self.signals.recv() => {
                    match signal {
                        Some(ReaderSignal::CommandSent) => {
                            self.advance(SessionState::Authenticated, SessionState::CommandSent);
                        }
                        Some(ReaderSignal::Fault(e)) => return Exit::Failed(e),
                        Some(ReaderSignal::Interrupted) => {
                            debug!("Interrupt acknowledged, draining until close");
                            self.interrupted = true;
                        }
                        Some(ReaderSignal::ForceClose) => {
                            debug!("Forced close");
                            return Exit::Closed;
                        }
                        None => {
                            debug!("Session dropped");
                            return Exit::Closed;
                        }
                    }
                }

                message = self.source.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            if let Err(e) = self.handle_text(&text) {
                                return Exit::Failed(e);
                            }
                        }

                        Some(Ok(Message::Binary(bytes))) => {
                            let handled = std::str::from_utf8(&bytes)
                                .map_err(|e| Error::decode(e.to_string()))
                                .and_then(|text| self.handle_text(text));
                            if let Err(e) = handled {
                                return Exit::Failed(e);
                            }
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by remote");
                            return Exit::Closed;
                        }

                        Some(Err(e)) => {
                            return Exit::Failed(Error::transport(e.to_string()));
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            return Exit::Closed;
                        }

                        // Ping, Pong, raw frames
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
    }

    /// Decodes and applies one frame.
    fn handle_text(&mut self, text: &str) -> Result<()> {
        let frame = codec::decode(text)?;

        trace!(
            fd = ?frame.fd,
            log = ?frame.log,
            auth = frame.auth,
            finished = frame.finished,
            code = ?frame.code,
            "Received frame"
        );

        match frame.kind() {
            FrameKind::Authenticated => {
                self.emit_trailing_text(&frame);
                if !self.advance(SessionState::Connected, SessionState::Authenticated) {
                    warn!("Unexpected auth acknowledgement");
                }
            }

            FrameKind::Completed { code } => {
                self.emit_trailing_text(&frame);
                self.complete(code);
            }

            FrameKind::Output(line) => {
                self.sink.dispatch(&line);
                let current = *self.state.borrow();
                if current.is_authenticated() && current != SessionState::Streaming {
                    self.state.send_replace(SessionState::Streaming);
                }
            }
        }

        Ok(())
    }

    /// Control frames may carry text; it goes out before the control effect.
    fn emit_trailing_text(&self, frame: &ServerFrame) {
        if frame.has_text() {
            self.sink.dispatch(&frame.output());
        }
    }

    /// Delivers the completion code, once.
    fn complete(&mut self, code: u8) {
        match self.completion.take() {
            Some(tx) => {
                debug!(code, "Command completed");
                self.state.send_replace(SessionState::Finished { code });
                let _ = tx.send(Ok(code));
            }
            None => warn!(code, "Duplicate completion ignored"),
        }
    }

    /// Resolves a still-pending completion with `error`.
    fn fail_pending(&mut self, error: Error) {
        if let Some(tx) = self.completion.take() {
            debug!(error = %error, "Failing pending command");
            let _ = tx.send(Err(error));
        }
    }

    /// Moves `from → to`; returns `false` if the session was not in `from`.
    fn advance(&self, from: SessionState, to: SessionState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }
}
