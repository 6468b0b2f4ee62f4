//! WebSocket transport over `tokio-tungstenite`.
//!
//! # Event Loop
//!
//! Each handle spawns a tokio task that:
//!
//! - Performs the WebSocket handshake and reports `opened`
//! - Forwards queued outbound frames to the socket
//! - Forwards inbound text frames to the client
//! - Reports `closed` or `error` exactly once when it stops

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::{Transport, TransportEvents, TransportHandle};

// ============================================================================
// Types
// ============================================================================

/// Commands from the handle to the socket task.
enum Outbound {
    /// Send a text frame.
    Text(String),
    /// Close the socket.
    Close,
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// Default transport: one WebSocket per connect attempt.
///
/// Only plain `ws://` URLs are supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl Transport for WebSocketTransport {
    fn open(&self, url: &Url, events: TransportEvents) -> Box<dyn TransportHandle> {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let ready = Arc::new(AtomicBool::new(false));

        tokio::spawn(run_socket(
            url.clone(),
            outbound_rx,
            events,
            Arc::clone(&ready),
        ));

        Box::new(WebSocketHandle {
            outbound: outbound_tx,
            ready,
        })
    }
}

// ============================================================================
// WebSocketHandle
// ============================================================================

/// Handle on a socket task.
struct WebSocketHandle {
    /// Channel to the socket task.
    outbound: mpsc::UnboundedSender<Outbound>,
    /// Set while the socket is open.
    ready: Arc<AtomicBool>,
}

impl TransportHandle for WebSocketHandle {
    fn send(&self, text: String) -> Result<()> {
        self.outbound
            .send(Outbound::Text(text))
            .map_err(|_| Error::transport("socket task has stopped"))
    }

    fn close(&self) {
        let _ = self.outbound.send(Outbound::Close);
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

// ============================================================================
// Socket Task
// ============================================================================

/// Drives one WebSocket until it closes.
async fn run_socket(
    url: Url,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: TransportEvents,
    ready: Arc<AtomicBool>,
) {
    let generation = events.generation();

    let ws_stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            debug!(%url, generation, error = %e, "WebSocket handshake failed");
            events.error(Error::from(e));
            return;
        }
    };

    ready.store(true, Ordering::Release);
    events.opened();

    let (mut ws_write, mut ws_read) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(generation, len = text.len(), "Frame received");
                        events.message(text.as_str());
                    }

                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                        Ok(text) => events.message(text),
                        Err(_) => warn!(generation, "Dropping non UTF-8 binary frame"),
                    },

                    Some(Ok(Message::Close(frame))) => {
                        break match frame {
                            Some(frame) if !frame.reason.is_empty() => {
                                frame.reason.as_str().to_string()
                            }
                            _ => "closed by server".to_string(),
                        };
                    }

                    Some(Err(e)) => {
                        ready.store(false, Ordering::Release);
                        events.error(Error::from(e));
                        return;
                    }

                    None => break "stream ended".to_string(),

                    // Ping/Pong are answered by tungstenite
                    Some(Ok(_)) => {}
                }
            }

            command = outbound.recv() => {
                match command {
                    Some(Outbound::Text(text)) => {
                        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                            ready.store(false, Ordering::Release);
                            events.error(Error::from(e));
                            return;
                        }
                    }

                    // Handle dropped or closed explicitly
                    Some(Outbound::Close) | None => {
                        let _ = ws_write.close().await;
                        break "closed by client".to_string();
                    }
                }
            }
        }
    };

    ready.store(false, Ordering::Release);
    debug!(%url, generation, %reason, "WebSocket closed");
    events.closed(reason);
}
