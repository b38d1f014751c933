//! Remote command session.
//!
//! A [`Session`] owns one WebSocket connection to the Trixie service and runs
//! exactly one command over it.
//!
//! # Lifecycle
//!
//! 1. [`Session::open`] dials the server and spawns the reader, writer and
//!    heartbeat tasks
//! 2. [`Session::run_command`] sends the auth frame, waits for the ack,
//!    sends the command frame and waits for the completion code
//! 3. [`Session::close`] performs the close handshake (or drop the session
//!    to abort its tasks)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use trixie::{ConsoleSink, Session, SessionOptions};
//!
//! # async fn example() -> trixie::Result<()> {
//! let mut session = Session::open(
//!     "https://trixie.example.net",
//!     Arc::new(ConsoleSink::new()),
//!     SessionOptions::default(),
//! )
//! .await?;
//!
//! let code = session.run_command("token", "vm.list", &[]).await?;
//! session.close().await;
//! std::process::exit(i32::from(code));
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{Notify, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::output::SharedSink;
use crate::protocol::ClientFrame;

use super::heartbeat::{Heartbeat, InterruptHandle, close_handshake};
use super::reader::{Reader, ReaderSignal};
use super::state::SessionState;
use super::writer::WriterHandle;

// ============================================================================
// Constants
// ============================================================================

/// Interval between keepalive pings.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// How long the close handshake may take before the socket is forced shut.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// How long to wait for the server to acknowledge the auth frame.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// SessionOptions
// ============================================================================

/// Tunables for a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Interval between keepalive pings.
    pub heartbeat_interval: Duration,
    /// Bound on the close handshake.
    pub close_timeout: Duration,
    /// Bound on the auth handshake.
    pub auth_timeout: Duration,
    /// Turn Ctrl-C into a graceful close.
    pub handle_ctrl_c: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            handle_ctrl_c: true,
        }
    }
}

impl SessionOptions {
    /// Sets the ping interval.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the close handshake bound.
    #[inline]
    #[must_use]
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Sets the auth handshake bound.
    #[inline]
    #[must_use]
    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    /// Enables or disables the Ctrl-C listener.
    #[inline]
    #[must_use]
    pub fn with_ctrl_c(mut self, enabled: bool) -> Self {
        self.handle_ctrl_c = enabled;
        self
    }
}

// ============================================================================
// Session
// ============================================================================

/// One authenticated command over one WebSocket connection.
///
/// Output is pushed to the [`OutputSink`](crate::OutputSink) by the reader
/// task while [`run_command`](Self::run_command) waits. Dropping the session
/// aborts all of its tasks.
pub struct Session {
    /// WebSocket URL that was dialed.
    url: Url,
    /// Queue into the writer task.
    writer: WriterHandle,
    /// Control channel into the reader task.
    signals: mpsc::UnboundedSender<ReaderSignal>,
    /// Published by the reader task.
    state: watch::Receiver<SessionState>,
    /// Taken by the single command.
    completion: Option<oneshot::Receiver<Result<u8>>>,
    /// Shared with the heartbeat task.
    interrupt: InterruptHandle,
    /// Stops the heartbeat before the caller closes.
    heartbeat_stop: Arc<Notify>,
    options: SessionOptions,
    /// Code of the finished command.
    last_code: Option<u8>,
    /// Reader, writer, heartbeat and signal listener.
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    /// Dials `address` and starts the session tasks.
    ///
    /// `http`/`https` addresses are dialed as `ws`/`wss`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `address` is not a usable URL
    /// - [`Error::Dial`] if the connection cannot be established
    pub async fn open(address: &str, sink: SharedSink, options: SessionOptions) -> Result<Self> {
        let url = ws_url(address)?;
        debug!(%url, "Dialing");

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::dial(url.as_str(), e.to_string()))?;

        info!(%url, "Session connected");

        let (ws_sink, ws_source) = ws_stream.split();
        let (state_tx, state_rx) = watch::channel(SessionState::Connected);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = oneshot::channel();

        let (writer, writer_task) = WriterHandle::spawn(ws_sink, signal_tx.clone());

        let reader = Reader::new(ws_source, signal_rx, state_tx, completion_tx, sink);
        let reader_task = tokio::spawn(reader.run());

        let interrupt = InterruptHandle::new();
        let heartbeat_stop = Arc::new(Notify::new());
        let heartbeat = Heartbeat {
            writer: writer.clone(),
            signals: signal_tx.clone(),
            state: state_rx.clone(),
            interrupt: interrupt.clone(),
            stop: Arc::clone(&heartbeat_stop),
            interval: options.heartbeat_interval,
            close_timeout: options.close_timeout,
        };
        let heartbeat_task = tokio::spawn(heartbeat.run());

        let mut tasks = vec![reader_task, writer_task, heartbeat_task];
        if options.handle_ctrl_c {
            tasks.push(tokio::spawn(forward_ctrl_c(interrupt.clone())));
        }

        Ok(Self {
            url,
            writer,
            signals: signal_tx,
            state: state_rx,
            completion: Some(completion_rx),
            interrupt,
            heartbeat_stop,
            options,
            last_code: None,
            tasks,
        })
    }

    /// Authenticates with `token` and runs `action` with `params`.
    ///
    /// Returns the completion code; a missing code counts as `0`. The
    /// command frame is only written after the server acknowledged the
    /// auth frame. If the session finishes or closes before that, the
    /// command is not sent.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionSpent`] if a command was already run
    /// - [`Error::AuthTimeout`] if the auth frame is not acknowledged in time
    /// - [`Error::Decode`] if the server sent a malformed frame
    /// - [`Error::Transport`] / [`Error::ConnectionClosed`] if the
    ///   connection failed or closed first
    /// - [`Error::Interrupted`] if the session was interrupted
    pub async fn run_command(&mut self, token: &str, action: &str, params: &[String]) -> Result<u8> {
        let completion = self.completion.take().ok_or(Error::SessionSpent)?;

        self.writer.send_frame(&ClientFrame::auth(token)).await?;
        debug!("Auth frame sent");

        if !self.wait_authenticated().await? {
            debug!(state = ?self.state(), "Session ended before authentication");
            return self.await_completion(completion).await;
        }

        self.writer
            .send_frame(&ClientFrame::command(action, params))
            .await?;
        let _ = self.signals.send(ReaderSignal::CommandSent);
        debug!(action, params = params.len(), "Command sent");

        self.await_completion(completion).await
    }

    /// Performs the close handshake and stops the session tasks.
    ///
    /// Returns the state the session ended in.
    pub async fn close(mut self) -> SessionState {
        self.heartbeat_stop.notify_one();

        let close_timeout = self.options.close_timeout;
        close_handshake(&self.writer, &self.signals, &mut self.state, close_timeout).await;

        // The reader publishes the final state after the forced close.
        let _ = timeout(close_timeout, self.state.wait_for(|s| s.is_closed())).await;

        let state = self.state();
        debug!(url = %self.url, ?state, "Session closed by caller");
        state
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Returns the code of the finished command, if any.
    #[inline]
    #[must_use]
    pub const fn last_code(&self) -> Option<u8> {
        self.last_code
    }

    /// Returns the WebSocket URL this session is connected to.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns a handle that triggers the interrupt path.
    #[inline]
    #[must_use]
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Waits for the auth ack. `Ok(false)` means the session reached a
    /// terminal state first.
    async fn wait_authenticated(&mut self) -> Result<bool> {
        let auth_timeout = self.options.auth_timeout;

        let reached = timeout(
            auth_timeout,
            self.state
                .wait_for(|s| s.is_authenticated() || s.is_terminal()),
        )
        .await
        .map_err(|_| Error::auth_timeout(auth_timeout.as_millis() as u64))?
        .map(|state| state.is_authenticated());

        match reached {
            Ok(authenticated) => Ok(authenticated),
            // Reader gone: its outcome is already on the completion channel.
            Err(_) => Ok(false),
        }
    }

    async fn await_completion(&mut self, completion: oneshot::Receiver<Result<u8>>) -> Result<u8> {
        let code = completion.await.map_err(|_| Error::ConnectionClosed)??;
        self.last_code = Some(code);
        info!(code, "Command finished");
        Ok(code)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Maps a service address to its WebSocket URL.
///
/// `http` → `ws` and `https` → `wss`; `ws`/`wss` pass through.
///
/// # Errors
///
/// Returns [`Error::Config`] for unparsable addresses or other schemes.
pub fn ws_url(address: &str) -> Result<Url> {
    let mut url = Url::parse(address.trim())
        .map_err(|e| Error::config(format!("Invalid server URL '{address}': {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(Error::config(format!(
                "Unsupported URL scheme '{other}' in '{address}'"
            )));
        }
    };

    url.set_scheme(scheme)
        .map_err(|()| Error::config(format!("Cannot use '{address}' as a WebSocket URL")))?;

    Ok(url)
}

/// Forwards the first Ctrl-C to the session's interrupt handle.
async fn forward_ctrl_c(interrupt: InterruptHandle) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Ctrl-C received");
            interrupt.interrupt();
        }
        Err(e) => warn!(error = %e, "Cannot listen for Ctrl-C"),
    }
}

// ============================================================================
// Tests
// ============================================================================
