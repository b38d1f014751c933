//! Scripted WebSocket server for session tests.
//!
//! Binds to `127.0.0.1:0`, accepts one client and lets the test drive the
//! conversation frame by frame.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// MockServer
// ============================================================================

/// A bound server waiting for the client.
pub(crate) struct MockServer {
    listener: TcpListener,
    port: u16,
}

impl MockServer {
    /// Binds to a random localhost port.
    pub(crate) async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let port = listener.local_addr().expect("local addr").port();
        Self { listener, port }
    }

    /// The address a client should dial, in the config's `http` form.
    pub(crate) fn http_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Accepts one client and completes the WebSocket upgrade.
    pub(crate) async fn accept(self) -> MockPeer {
        let (stream, _) = self.listener.accept().await.expect("accept");
        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .expect("upgrade");
        MockPeer { ws, pings: 0 }
    }
}

// ============================================================================
// MockPeer
// ============================================================================

/// Server side of an accepted connection.
pub(crate) struct MockPeer {
    ws: WebSocketStream<TcpStream>,
    /// Pings seen so far.
    pub(crate) pings: usize,
}

/// What the peer read next.
#[derive(Debug)]
pub(crate) enum Received {
    Json(Value),
    Close,
    Ended,
}

impl MockPeer {
    /// Reads the next text frame as JSON, counting and skipping pings.
    pub(crate) async fn recv(&mut self) -> Received {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    let value = serde_json::from_str(&text).expect("client sent JSON");
                    return Received::Json(value);
                }
                Some(Ok(Message::Ping(_))) => self.pings += 1,
                Some(Ok(Message::Close(_))) => return Received::Close,
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return Received::Ended,
            }
        }
    }

    /// Reads the next JSON frame, panicking on anything else.
    pub(crate) async fn recv_json(&mut self) -> Value {
        match self.recv().await {
            Received::Json(value) => value,
            other => panic!("expected a JSON frame, got {other:?}"),
        }
    }

    /// Returns `true` if no text frame arrives within `window`.
    pub(crate) async fn stays_quiet(&mut self, window: Duration) -> bool {
        timeout(window, async {
            loop {
                match self.recv().await {
                    Received::Json(_) => return,
                    Received::Close | Received::Ended => {
                        std::future::pending::<()>().await;
                    }
                }
            }
        })
        .await
        .is_err()
    }

    /// Sends a JSON value as a text frame.
    pub(crate) async fn send_json(&mut self, value: Value) {
        self.send_text(&value.to_string()).await;
    }

    /// Sends raw text.
    pub(crate) async fn send_text(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("send to client");
    }

    /// Reads until the client's close frame (or the end of the stream).
    ///
    /// After a close frame the stream is drained so the reply goes out.
    pub(crate) async fn wait_for_close(&mut self) -> bool {
        loop {
            match self.recv().await {
                Received::Json(_) => {}
                Received::Close => {
                    let _ = timeout(Duration::from_secs(2), async {
                        while let Some(Ok(_)) = self.ws.next().await {}
                    })
                    .await;
                    return true;
                }
                Received::Ended => return false,
            }
        }
    }

    /// Sends a close frame from the server side.
    pub(crate) async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}
