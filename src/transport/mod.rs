//! Streaming transport layer.
//!
//! The client treats the transport as a black box with four affordances:
//! send a frame, close, report readiness, and emit lifecycle events.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  open(url, events)   ┌──────────────────┐
//! │  StrestClient    │─────────────────────►│  Transport       │
//! │  (event loop)    │                      │                  │
//! │                  │◄─────────────────────│  TransportHandle │
//! │                  │  opened / message /  │  (one per        │
//! │                  │  closed / error      │   attempt)       │
//! └──────────────────┘                      └──────────────────┘
//! ```
//!
//! Every connect attempt opens a fresh handle. Its events are tagged with
//! the attempt's generation so that late events from a superseded handle
//! can be told apart from the live one.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | Default transport over `tokio-tungstenite` |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket transport.
pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use websocket::WebSocketTransport;

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use tracing::trace;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Traits
// ============================================================================

/// Factory for transport handles.
///
/// Implementations must not block: `open` starts the connection attempt
/// and reports its outcome through `events`.
pub trait Transport: Send + Sync + 'static {
    /// Starts connecting to `url`.
    fn open(&self, url: &Url, events: TransportEvents) -> Box<dyn TransportHandle>;
}

/// A single connection attempt.
///
/// Dropping the handle closes the underlying connection.
pub trait TransportHandle: Send + Sync {
    /// Queues a text frame for sending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the connection can no longer send.
    fn send(&self, text: String) -> Result<()>;

    /// Starts closing the connection.
    fn close(&self);

    /// Returns `true` while frames can be sent.
    fn is_ready(&self) -> bool;
}

// ============================================================================
// TransportEvent
// ============================================================================

/// Lifecycle and data events reported by a transport handle.
#[derive(Debug)]
pub enum TransportEvent {
    /// The connection is established.
    Opened,
    /// A text frame arrived.
    Message(String),
    /// The connection closed.
    Closed(String),
    /// The connection failed.
    Error(Error),
}

/// Generation-tagged sink for [`TransportEvent`]s.
#[derive(Debug, Clone)]
pub struct TransportEvents {
    /// Connect attempt these events belong to.
    generation: u64,
    /// Channel into the client's event loop.
    tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
}

impl TransportEvents {
    /// Creates a sink for one connect attempt.
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, TransportEvent)>) -> Self {
        Self { generation, tx }
    }

    /// Returns the connect attempt these events belong to.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Reports that the connection is open.
    pub fn opened(&self) {
        self.emit(TransportEvent::Opened);
    }

    /// Reports an inbound text frame.
    pub fn message(&self, text: impl Into<String>) {
        self.emit(TransportEvent::Message(text.into()));
    }

    /// Reports that the connection closed.
    pub fn closed(&self, reason: impl Into<String>) {
        self.emit(TransportEvent::Closed(reason.into()));
    }

    /// Reports a transport failure.
    pub fn error(&self, error: Error) {
        self.emit(TransportEvent::Error(error));
    }

    fn emit(&self, event: TransportEvent) {
        if self.tx.send((self.generation, event)).is_err() {
            trace!(generation = self.generation, "Client gone, transport event dropped");
        }
    }
}
