//! Heartbeat / interrupt task.
//!
//! Pings the server on a fixed interval while the session is open, and turns
//! a process interrupt into a close handshake: send a close frame, give the
//! reader a bounded time to see the server's reply, then force the socket
//! shut.
//!
//! Pings are queued without waiting for the write, so a stalled socket never
//! holds up the interrupt path.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, mpsc, watch};
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, info, trace, warn};

use crate::error::Error;

use super::reader::ReaderSignal;
use super::state::SessionState;
use super::writer::WriterHandle;

// ============================================================================
// InterruptHandle
// ============================================================================

/// Triggers the interrupt path of a session.
///
/// Cloneable; an interrupt raised before the heartbeat task gets to wait
/// for it is not lost.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    notify: Arc<Notify>,
}

impl InterruptHandle {
    /// Creates a handle.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a graceful close of the session.
    pub fn interrupt(&self) {
        self.notify.notify_one();
    }

    /// Waits for an interrupt request.
    pub(crate) async fn interrupted(&self) {
        self.notify.notified().await;
    }
}

// ============================================================================
// Heartbeat
// ============================================================================

/// State owned by the heartbeat task.
pub(crate) struct Heartbeat {
    pub(crate) writer: WriterHandle,
    pub(crate) signals: mpsc::UnboundedSender<ReaderSignal>,
    pub(crate) state: watch::Receiver<SessionState>,
    pub(crate) interrupt: InterruptHandle,
    /// Notified when the caller takes over the close handshake.
    pub(crate) stop: Arc<Notify>,
    pub(crate) interval: Duration,
    pub(crate) close_timeout: Duration,
}

impl Heartbeat {
    /// Runs until the session closes, the caller stops it, a ping cannot be
    /// queued, or an interrupt is handled.
    pub(crate) async fn run(self) {
        let Self {
            writer,
            signals,
            mut state,
            interrupt,
            stop,
            interval: period,
            close_timeout,
        } = self;

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                () = stop.notified() => {
                    debug!("Heartbeat stopped by caller");
                    break;
                }

                () = interrupt.interrupted() => {
                    info!("Interrupt received, closing session");
                    let _ = signals.send(ReaderSignal::Interrupted);
                    close_handshake(&writer, &signals, &mut state, close_timeout).await;
                    break;
                }

                changed = state.changed() => {
                    if changed.is_err() || state.borrow().is_closed() {
                        debug!("Session closed, heartbeat stopping");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    if state.borrow().is_closed() {
                        break;
                    }
                    if let Err(e) = writer.ping() {
                        warn!(error = %e, "Ping failed");
                        break;
                    }
                    trace!("Ping queued");
                }
            }
        }

        debug!("Heartbeat task terminated");
    }
}

// ============================================================================
// Close Handshake
// ============================================================================

/// Sends a close frame and waits for the reader to see the socket close,
/// then forces it shut.
///
/// Writing the close frame counts against `close_timeout` too, so this
/// returns within the bound even if the socket is stalled.
pub(crate) async fn close_handshake(
    writer: &WriterHandle,
    signals: &mpsc::UnboundedSender<ReaderSignal>,
    state: &mut watch::Receiver<SessionState>,
    close_timeout: Duration,
) {
    if !state.borrow().is_closed() {
        let handshake = async {
            writer.close().await?;
            state
                .wait_for(|s| s.is_closed())
                .await
                .map_err(|_| Error::ConnectionClosed)?;
            Ok::<(), Error>(())
        };

        match timeout(close_timeout, handshake).await {
            Ok(Ok(())) => debug!("Close handshake complete"),
            Ok(Err(e)) => debug!(error = %e, "Close handshake cut short"),
            Err(_) => warn!(
                timeout_ms = close_timeout.as_millis() as u64,
                "Close handshake timed out, forcing"
            ),
        }
    }

    let _ = signals.send(ReaderSignal::ForceClose);
    writer.shutdown();
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Instant;

    use tokio_tungstenite::tungstenite::Message;

    use crate::transport::writer::WriterCommand;

    const BOUND: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn test_interrupt_before_wait_is_kept() {
        let handle = InterruptHandle::new();
        handle.interrupt();

        timeout(Duration::from_millis(100), handle.interrupted())
            .await
            .expect("stored interrupt should be observed");
    }

    #[tokio::test]
    async fn test_clone_shares_signal() {
        let handle = InterruptHandle::new();
        let clone = handle.clone();
        clone.interrupt();

        timeout(Duration::from_millis(100), handle.interrupted())
            .await
            .expect("interrupt raised on a clone");
    }

    #[tokio::test]
    async fn test_close_handshake_is_bounded_on_a_stalled_writer() {
        let (writer, mut commands) = WriterHandle::stalled();
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();
        let (_state_tx, mut state_rx) = watch::channel(SessionState::Streaming);

        let started = Instant::now();
        timeout(
            Duration::from_secs(2),
            close_handshake(&writer, &signal_tx, &mut state_rx, BOUND),
        )
        .await
        .expect("close handshake hung");
        assert!(started.elapsed() >= BOUND);

        assert!(matches!(signal_rx.try_recv(), Ok(ReaderSignal::ForceClose)));
        assert!(matches!(
            commands.try_recv(),
            Ok(WriterCommand::Send { message: Message::Close(_), .. })
        ));
        assert!(matches!(commands.try_recv(), Ok(WriterCommand::Shutdown)));
    }

    #[tokio::test]
    async fn test_close_handshake_skips_frame_when_closed() {
        let (writer, mut commands) = WriterHandle::stalled();
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();
        let (_state_tx, mut state_rx) = watch::channel(SessionState::ClosedNormal);

        close_handshake(&writer, &signal_tx, &mut state_rx, BOUND).await;

        assert!(matches!(signal_rx.try_recv(), Ok(ReaderSignal::ForceClose)));
        assert!(matches!(commands.try_recv(), Ok(WriterCommand::Shutdown)));
    }

    #[tokio::test]
    async fn test_interrupt_ends_heartbeat_on_a_stalled_writer() {
        let (writer, mut commands) = WriterHandle::stalled();
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();
        let (_state_tx, state_rx) = watch::channel(SessionState::Streaming);
        let interrupt = InterruptHandle::new();

        let heartbeat = Heartbeat {
            writer,
            signals: signal_tx,
            state: state_rx,
            interrupt: interrupt.clone(),
            stop: Arc::new(Notify::new()),
            interval: Duration::from_millis(10),
            close_timeout: BOUND,
        };
        let task = tokio::spawn(heartbeat.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        interrupt.interrupt();

        timeout(Duration::from_secs(2), task)
            .await
            .expect("heartbeat hung")
            .expect("heartbeat panicked");

        assert!(matches!(signal_rx.try_recv(), Ok(ReaderSignal::Interrupted)));
        assert!(matches!(signal_rx.try_recv(), Ok(ReaderSignal::ForceClose)));

        let mut pings = 0;
        while let Ok(WriterCommand::Send { message: Message::Ping(_), .. }) = commands.try_recv() {
            pings += 1;
        }
        assert!(pings >= 2, "expected queued pings, saw {pings}");
    }

    #[tokio::test]
    async fn test_stop_ends_heartbeat() {
        let (writer, _commands) = WriterHandle::stalled();
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();
        let (_state_tx, state_rx) = watch::channel(SessionState::Finished { code: 0 });
        let stop = Arc::new(Notify::new());

        let heartbeat = Heartbeat {
            writer,
            signals: signal_tx,
            state: state_rx,
            interrupt: InterruptHandle::new(),
            stop: Arc::clone(&stop),
            interval: Duration::from_millis(10),
            close_timeout: BOUND,
        };
        let task = tokio::spawn(heartbeat.run());
        stop.notify_one();

        timeout(Duration::from_secs(1), task)
            .await
            .expect("heartbeat ignored stop")
            .expect("heartbeat panicked");
        assert!(signal_rx.try_recv().is_err());
    }
}
