//! Writer task.
//!
//! Owns the write half of the socket. The caller (auth and command frames)
//! and the heartbeat task (ping and close) both write through a
//! [`WriterHandle`], so frames reach the socket one at a time and in the
//! order they were queued.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::SinkExt;
use futures_util::stream::SplitSink;
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, error, trace};

use crate::error::{Error, Result};
use crate::protocol::{ClientFrame, codec};

use super::WsStream;
use super::reader::ReaderSignal;

// ============================================================================
// Types
// ============================================================================

/// Write half of the session socket.
pub(crate) type WsSink = SplitSink<WsStream, Message>;

/// Internal commands for the writer task.
#[derive(Debug)]
pub(crate) enum WriterCommand {
    /// Write a message and report the outcome.
    Send {
        message: Message,
        ack: oneshot::Sender<Result<()>>,
    },
    /// Drop the write half.
    Shutdown,
}

// ============================================================================
// WriterHandle
// ============================================================================

/// Queue into the writer task.
#[derive(Clone)]
pub(crate) struct WriterHandle {
    command_tx: mpsc::UnboundedSender<WriterCommand>,
    /// Wakes the writer out of a stalled write.
    halt: Arc<Notify>,
}

impl WriterHandle {
    /// Spawns the writer task over `sink`.
    ///
    /// Write failures are reported to the reader task on `signals`.
    pub(crate) fn spawn(
        sink: WsSink,
        signals: mpsc::UnboundedSender<ReaderSignal>,
    ) -> (Self, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let halt = Arc::new(Notify::new());
        let task = tokio::spawn(run_writer(sink, command_rx, signals, Arc::clone(&halt)));
        (Self { command_tx, halt }, task)
    }

    /// A handle whose queue is never drained. Every `send` hangs.
    #[cfg(test)]
    pub(crate) fn stalled() -> (Self, mpsc::UnboundedReceiver<WriterCommand>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let halt = Arc::new(Notify::new());
        (Self { command_tx, halt }, command_rx)
    }

    /// Writes a message and waits until it has been flushed.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`] if the socket write fails
    /// - [`Error::ConnectionClosed`] if the writer task is gone or the
    ///   close frame was already written
    pub(crate) async fn send(&self, message: Message) -> Result<()> {
        let ack_rx = self.enqueue(message)?;
        ack_rx.await.map_err(|_| Error::ConnectionClosed)?
    }

    /// Encodes and writes a client frame as a text message.
    pub(crate) async fn send_frame(&self, frame: &ClientFrame) -> Result<()> {
        let text = codec::encode(frame)?;
        self.send(Message::Text(text.into())).await
    }

    /// Queues a ping control frame without waiting for the write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the writer task is gone.
    pub(crate) fn ping(&self) -> Result<()> {
        self.enqueue(Message::Ping(Default::default())).map(drop)
    }

    /// Writes a normal-closure close frame.
    pub(crate) async fn close(&self) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: Default::default(),
        };
        self.send(Message::Close(Some(frame))).await
    }

    /// Stops the writer task, dropping the write half.
    ///
    /// A write in progress is abandoned.
    pub(crate) fn shutdown(&self) {
        let _ = self.command_tx.send(WriterCommand::Shutdown);
        self.halt.notify_one();
    }

    fn enqueue(&self, message: Message) -> Result<oneshot::Receiver<Result<()>>> {
        let (ack, ack_rx) = oneshot::channel();

        self.command_tx
            .send(WriterCommand::Send { message, ack })
            .map_err(|_| Error::ConnectionClosed)?;

        Ok(ack_rx)
    }
}

// ============================================================================
// Writer Loop
// ============================================================================

/// Writes queued messages until shutdown or the first failure.
///
/// Once the close frame is out, later pings and close frames are dropped
/// and anything else is refused with [`Error::ConnectionClosed`].
async fn run_writer(
    mut sink: WsSink,
    mut command_rx: mpsc::UnboundedReceiver<WriterCommand>,
    signals: mpsc::UnboundedSender<ReaderSignal>,
    halt: Arc<Notify>,
) {
    let mut closing = false;

    loop {
        let command = tokio::select! {
            biased;
            () = halt.notified() => break,
            command = command_rx.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        let (message, ack) = match command {
            WriterCommand::Send { message, ack } => (message, ack),
            WriterCommand::Shutdown => {
                debug!("Writer shutdown");
                break;
            }
        };

        let kind = message_kind(&message);

        if closing {
            trace!(kind, "Dropped after close frame");
            let outcome = match message {
                Message::Ping(_) | Message::Close(_) => Ok(()),
                _ => Err(Error::ConnectionClosed),
            };
            let _ = ack.send(outcome);
            continue;
        }

        let is_close = matches!(message, Message::Close(_));

        let written = tokio::select! {
            biased;
            () = halt.notified() => {
                debug!(kind, "Write abandoned");
                let _ = ack.send(Err(Error::ConnectionClosed));
                break;
            }
            written = sink.send(message) => written,
        };

        match written {
            Ok(()) => {
                trace!(kind, "Message written");
                closing = is_close;
                let _ = ack.send(Ok(()));
            }
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                debug!(kind, "Socket already closed");
                closing = true;
                let _ = ack.send(Err(Error::ConnectionClosed));
            }
            Err(e) => {
                error!(kind, error = %e, "WebSocket write failed");
                let message = e.to_string();
                let _ = signals.send(ReaderSignal::Fault(Error::transport(message.clone())));
                let _ = ack.send(Err(Error::transport(message)));
                break;
            }
        }
    }

    debug!("Writer task terminated");
}

/// Short label for logging.
fn message_kind(message: &Message) -> &'static str {
    match message {
        Message::Text(_) => "text",
        Message::Binary(_) => "binary",
        Message::Ping(_) => "ping",
        Message::Pong(_) => "pong",
        Message::Close(_) => "close",
        Message::Frame(_) => "frame",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use futures_util::StreamExt;
    use tokio::time::timeout;
    use tokio_tungstenite::connect_async;

    use crate::transport::mock::{MockServer, Received};
    use crate::transport::session::ws_url;

    /// Dials a mock server and spawns a writer over the client's write half.
    async fn connected() -> (
        WriterHandle,
        mpsc::UnboundedReceiver<ReaderSignal>,
        crate::transport::mock::MockPeer,
    ) {
        let server = MockServer::bind().await;
        let url = ws_url(&server.http_url()).expect("url");
        let accept = tokio::spawn(server.accept());

        let (ws, _) = connect_async(url.as_str()).await.expect("dial");
        let (sink, _source) = ws.split();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (writer, _task) = WriterHandle::spawn(sink, signal_tx);

        (writer, signal_rx, accept.await.expect("accept"))
    }

    #[test]
    fn test_message_kind() {
        assert_eq!(message_kind(&Message::Text("x".into())), "text");
        assert_eq!(message_kind(&Message::Ping(Default::default())), "ping");
        assert_eq!(message_kind(&Message::Close(None)), "close");
    }

    #[tokio::test]
    async fn test_send_after_shutdown_reports_closed() {
        let (handle, command_rx) = WriterHandle::stalled();
        drop(command_rx);

        assert!(matches!(handle.ping(), Err(Error::ConnectionClosed)));
        let err = handle.close().await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_ping_does_not_wait_for_the_write() {
        let (handle, mut command_rx) = WriterHandle::stalled();

        handle.ping().expect("queued");
        assert!(matches!(
            command_rx.try_recv(),
            Ok(WriterCommand::Send { message: Message::Ping(_), .. })
        ));
    }

    #[tokio::test]
    async fn test_frames_after_close_are_not_faults() {
        let (writer, mut signals, mut peer) = connected().await;

        writer.close().await.expect("close frame");
        writer.ping().expect("queued");
        writer.close().await.expect("second close is a no-op");

        let refused = writer.send(Message::Text("late".into())).await;
        assert!(matches!(refused, Err(Error::ConnectionClosed)));

        assert!(matches!(peer.recv().await, Received::Close));
        assert!(signals.try_recv().is_err(), "writer reported a fault");
    }

    #[tokio::test]
    async fn test_shutdown_abandons_queued_writes() {
        let (writer, _signals, _peer) = connected().await;

        writer.shutdown();
        let result = timeout(Duration::from_secs(1), writer.close())
            .await
            .expect("close did not hang");
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }
}
