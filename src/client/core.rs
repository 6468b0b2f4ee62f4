//! STREST client and its event loop.
//!
//! The [`StrestClient`] owns one connection at a time and multiplexes
//! transactions over it. A tokio task per client serializes:
//!
//! - Transport events (open, inbound frames, close, error)
//! - Ping probe and reconnect ticks
//! - Close and shutdown requests
//!
//! Every user callback runs on that task, one at a time.
//!
//! # State Machine
//!
//! ```text
//!                connect()               transport open
//! Disconnected ───────────► Connecting ─────────────────► Open
//!                              ▲  │                         │
//!           reconnect tick     │  │ close / error           │ close / error
//!           (keepalive)        │  ▼                         ▼
//!                              Closed ◄─────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures_util::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
#[cfg(test)]
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::TxnIdGenerator;
use crate::protocol::{DEFAULT_METHOD, Request, RequestOptions, Response};
use crate::transport::{Transport, TransportEvent, TransportEvents, TransportHandle};

use super::builder::ClientBuilder;
use super::config::ClientConfig;
use super::registry::{TransactionCallbacks, TransactionRegistry};
use super::timer::ScheduledTask;

// ============================================================================
// Types
// ============================================================================

/// Called when the connection opens.
pub type OpenCallback = Box<dyn Fn() + Send + Sync>;

/// Called with the reason whenever the connection closes.
pub type CloseCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Generation-tagged transport event.
type TaggedEvent = (u64, TransportEvent);

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of the client's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Never connected.
    Disconnected,
    /// A connect attempt is in progress.
    Connecting,
    /// Requests may be sent.
    Open,
    /// The last connection closed.
    Closed,
}

impl ConnectionState {
    /// Returns `true` for `Connecting` and `Open`.
    #[inline]
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        })
    }
}

// ============================================================================
// Command
// ============================================================================

/// Internal commands for the event loop.
enum Command {
    /// Send a ping probe if the given connection is still open.
    PingTick(u64),
    /// Attempt to reconnect.
    ReconnectTick,
    /// Close the current connection.
    Close { reason: String },
    /// Close for good and stop the event loop.
    Shutdown,
    /// Reply once every earlier input has been handled.
    #[cfg(test)]
    Barrier(oneshot::Sender<()>),
}

// ============================================================================
// Internal State
// ============================================================================

/// Mutable connection state.
struct ConnectionSlot {
    state: ConnectionState,
    /// Incremented for every connect attempt and every close.
    generation: u64,
    handle: Option<Box<dyn TransportHandle>>,
    ping: Option<ScheduledTask>,
    reconnect: Option<ScheduledTask>,
    shut_down: bool,
}

/// Shared state of a client.
pub(crate) struct ClientInner {
    config: ClientConfig,
    transport: Box<dyn Transport>,
    on_open: Option<OpenCallback>,
    on_close: Option<CloseCallback>,
    ids: TxnIdGenerator,
    registry: TransactionRegistry,
    connection: Mutex<ConnectionSlot>,
    /// Channel for commands to the event loop.
    commands: mpsc::UnboundedSender<Command>,
    /// Channel handed to transports for their events.
    events: mpsc::UnboundedSender<TaggedEvent>,
}

/// Everything [`ClientBuilder`] collects.
pub(crate) struct ClientParts {
    pub config: ClientConfig,
    pub transport: Box<dyn Transport>,
    pub on_open: Option<OpenCallback>,
    pub on_close: Option<CloseCallback>,
    pub ids: TxnIdGenerator,
}

// ============================================================================
// StrestClient
// ============================================================================

/// Client multiplexing STREST transactions over one connection.
///
/// Cloning yields another handle on the same client.
///
/// # Example
///
/// ```no_run
/// use strest_client::{RequestOptions, StrestClient, TransactionCallbacks};
///
/// # async fn example() -> strest_client::Result<()> {
/// let client = StrestClient::builder()
///     .url("ws://localhost:8000/strest")
///     .ping("/ping")
///     .on_open(|| println!("connected"))
///     .build()?;
///
/// client.connect();
/// // ... once open:
/// client.send_request(
///     RequestOptions::new("/firehose"),
///     TransactionCallbacks::new().on_message(|r| println!("{r}")),
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StrestClient {
    inner: Arc<ClientInner>,
}

impl StrestClient {
    /// Returns a builder for configuring a client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates the client and spawns its event loop.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn new(parts: ClientParts) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(ClientInner {
            config: parts.config,
            transport: parts.transport,
            on_open: parts.on_open,
            on_close: parts.on_close,
            ids: parts.ids,
            registry: TransactionRegistry::new(),
            connection: Mutex::new(ConnectionSlot {
                state: ConnectionState::Disconnected,
                generation: 0,
                handle: None,
                ping: None,
                reconnect: None,
                shut_down: false,
            }),
            commands: commands_tx,
            events: events_tx,
        });

        tokio::spawn(run_event_loop(
            Arc::downgrade(&inner),
            commands_rx,
            events_rx,
        ));

        Self { inner }
    }

    /// Starts connecting.
    ///
    /// Does nothing while a connection is open or being opened.
    pub fn connect(&self) {
        self.inner.connect();
    }

    /// Closes the current connection.
    ///
    /// Pending transactions fail with [`Error::ConnectionLost`]. With
    /// keepalive enabled the client reconnects afterwards; use
    /// [`shutdown`](Self::shutdown) to stop for good. The transition happens
    /// on the event loop shortly after this call returns.
    pub fn close(&self) {
        self.inner.request_close("closed by client");
    }

    /// Closes the connection, cancels reconnects and stops the event loop.
    pub fn shutdown(&self) {
        let _ = self.inner.commands.send(Command::Shutdown);
    }

    /// Sends a request and registers callbacks for its responses.
    ///
    /// Returns the request with its transaction headers filled in. Never
    /// waits: responses arrive through `callbacks`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the connection is not open
    /// - [`Error::TransactionCollision`] if the request carries the id of a
    ///   pending transaction
    /// - [`Error::InvalidRequest`] if the request carries a non-integer `txn.id`
    pub fn send_request(
        &self,
        request: impl Into<Request>,
        callbacks: TransactionCallbacks,
    ) -> Result<Request> {
        self.inner.send_request(request.into(), callbacks)
    }

    /// Sends a request and returns a stream of its response frames.
    ///
    /// The stream ends after the `complete` frame, or yields a single
    /// [`Error::ConnectionLost`] if the connection drops first.
    ///
    /// # Errors
    ///
    /// Same as [`send_request`](Self::send_request).
    pub fn send(&self, request: impl Into<Request>) -> Result<TransactionStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        let error_tx = tx.clone();

        let callbacks = TransactionCallbacks::new()
            .on_message(move |response| {
                let _ = tx.send(Ok(response.clone()));
            })
            .on_error(move |err| {
                let err = match err {
                    Error::ConnectionLost { reason } => Error::connection_lost(reason.clone()),
                    other => Error::transport(other.to_string()),
                };
                let _ = error_tx.send(Err(err));
            });

        let request = self.send_request(request, callbacks)?;
        Ok(TransactionStream { request, rx })
    }

    /// Returns the connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.connection.lock().state
    }

    /// Returns `true` if the connection is open and its transport is ready.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        let slot = self.inner.connection.lock();
        slot.state == ConnectionState::Open && slot.handle.as_ref().is_some_and(|h| h.is_ready())
    }

    /// Returns the server endpoint.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.config.url
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the number of pending transactions.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Waits until the event loop has handled everything queued so far.
    #[cfg(test)]
    pub(crate) async fn settle(&self) {
        let (tx, rx) = oneshot::channel();
        if self.inner.commands.send(Command::Barrier(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

impl fmt::Debug for StrestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrestClient")
            .field("url", &self.inner.config.url.as_str())
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish()
    }
}

// ============================================================================
// ClientInner - Operations
// ============================================================================

impl ClientInner {
    fn connect(&self) {
        let mut slot = self.connection.lock();
        if slot.shut_down {
            debug!("connect() ignored: client shut down");
            return;
        }
        if slot.state.is_live() {
            debug!(state = %slot.state, "connect() ignored: connection already live");
            return;
        }

        slot.generation += 1;
        let events = TransportEvents::new(slot.generation, self.events.clone());
        // Replacing the handle drops, and so closes, any previous one.
        slot.handle = Some(self.transport.open(&self.config.url, events));
        slot.state = ConnectionState::Connecting;

        debug!(url = %self.config.url, generation = slot.generation, "Connecting");
    }

    fn request_close(&self, reason: &str) {
        let _ = self.commands.send(Command::Close {
            reason: reason.to_string(),
        });
    }

    fn send_request(
        &self,
        mut request: Request,
        callbacks: TransactionCallbacks,
    ) -> Result<Request> {
        let slot = self.connection.lock();
        let handle = match (slot.state, slot.handle.as_ref()) {
            (ConnectionState::Open, Some(handle)) => handle,
            (state, _) => return Err(Error::not_connected(state)),
        };

        let txn_id = request
            .finalize(&self.ids)
            .ok_or_else(|| Error::invalid_request("txn.id must be an unsigned integer"))?;
        let wire = request.to_wire()?;

        self.registry.register(txn_id, callbacks)?;

        // A failed send surfaces as a close event, which fails the transaction.
        if let Err(e) = handle.send(wire) {
            warn!(txn_id = %txn_id, error = %e, "Request not handed to transport");
        }

        trace!(txn_id = %txn_id, uri = request.uri().unwrap_or_default(), "Request sent");
        Ok(request)
    }
}

// ============================================================================
// ClientInner - Event Handlers
// ============================================================================

impl ClientInner {
    fn handle_transport_event(self: &Arc<Self>, generation: u64, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.on_opened(generation),
            TransportEvent::Message(text) => self.on_frame(generation, text),
            TransportEvent::Closed(reason) => self.on_closed(Some(generation), &reason),
            TransportEvent::Error(err) => {
                warn!(generation, error = %err, "Transport error");
                self.on_closed(Some(generation), &err.to_string());
            }
        }
    }

    fn on_opened(self: &Arc<Self>, generation: u64) {
        {
            let mut slot = self.connection.lock();
            if slot.generation != generation || slot.state != ConnectionState::Connecting {
                trace!(generation, "Ignoring open from superseded transport");
                return;
            }

            slot.state = ConnectionState::Open;
            slot.reconnect = None;
            slot.ping = self.config.pings().then(|| self.schedule_ping(generation));
        }

        info!(url = %self.config.url, "Connection open");
        if let Some(on_open) = &self.on_open {
            on_open();
        }
    }

    fn on_frame(&self, generation: u64, text: String) {
        if self.connection.lock().generation != generation {
            trace!(generation, "Ignoring frame from superseded transport");
            return;
        }

        match Response::parse(text) {
            Ok(response) => {
                trace!(
                    txn_id = ?response.txn_id(),
                    status = ?response.txn_status(),
                    "Frame received"
                );
                self.registry.dispatch(&response);
            }
            Err(e) => warn!(error = %e, "Dropping frame"),
        }
    }

    fn on_closed(self: &Arc<Self>, generation: Option<u64>, reason: &str) {
        {
            let mut slot = self.connection.lock();
            if generation.is_some_and(|g| g != slot.generation) {
                trace!(?generation, "Ignoring close from superseded transport");
                return;
            }
            if !slot.state.is_live() {
                trace!(state = %slot.state, "Close ignored: connection not live");
                return;
            }

            slot.state = ConnectionState::Closed;
            slot.ping = None;
            if let Some(handle) = slot.handle.take() {
                handle.close();
            }
            // Late events from the dropped handle no longer match.
            slot.generation += 1;

            if self.config.keepalive && !slot.shut_down && slot.reconnect.is_none() {
                slot.reconnect = Some(self.schedule_reconnect());
            }
        }

        let failed = self.registry.fail_all(reason);
        info!(url = %self.config.url, reason, failed, "Connection closed");

        if let Some(on_close) = &self.on_close {
            on_close(reason);
        }
    }

    /// Sends one ping probe on the given connection.
    ///
    /// The probe only fails through `fail_all`, which runs once its
    /// connection is already closed, so failure is just logged.
    fn on_ping_tick(&self, generation: u64) {
        let Some(path) = self.config.ping.as_deref() else {
            return;
        };
        {
            let slot = self.connection.lock();
            if slot.generation != generation || slot.state != ConnectionState::Open {
                return;
            }
        }

        let callbacks = TransactionCallbacks::new().on_error(|err| {
            warn!(error = %err, "Ping probe failed");
        });

        let probe = Request::new(RequestOptions::new(path).with_method(DEFAULT_METHOD));
        match self.send_request(probe, callbacks) {
            Ok(request) => trace!(txn_id = ?request.txn_id(), "Ping probe sent"),
            Err(e) => warn!(error = %e, "Ping probe not sent"),
        }
    }

    fn on_shutdown(self: &Arc<Self>) {
        {
            let mut slot = self.connection.lock();
            slot.shut_down = true;
            slot.reconnect = None;
        }
        self.on_closed(None, "client shut down");
        debug!("Client shut down");
    }

    fn schedule_ping(&self, generation: u64) -> ScheduledTask {
        let commands = self.commands.clone();
        ScheduledTask::every("ping", self.config.ping_interval, move || {
            commands.send(Command::PingTick(generation)).is_ok()
        })
    }

    fn schedule_reconnect(&self) -> ScheduledTask {
        let commands = self.commands.clone();
        ScheduledTask::every("reconnect", self.config.reconnect_interval, move || {
            commands.send(Command::ReconnectTick).is_ok()
        })
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Input to the event loop.
enum Input {
    Command(Command),
    Transport(TaggedEvent),
}

/// Handles transport events and commands until shutdown.
///
/// Holds only a weak reference so dropping every client handle ends it.
async fn run_event_loop(
    inner: Weak<ClientInner>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut events: mpsc::UnboundedReceiver<TaggedEvent>,
) {
    loop {
        // Transport events first: a barrier or close must not overtake
        // frames that were already delivered.
        let input = tokio::select! {
            biased;
            event = events.recv() => event.map(Input::Transport),
            command = commands.recv() => command.map(Input::Command),
        };

        let Some(input) = input else {
            break;
        };
        let Some(inner) = inner.upgrade() else {
            break;
        };

        match input {
            Input::Transport((generation, event)) => {
                inner.handle_transport_event(generation, event);
            }
            Input::Command(Command::PingTick(generation)) => inner.on_ping_tick(generation),
            Input::Command(Command::ReconnectTick) => {
                trace!("Reconnect tick");
                inner.connect();
            }
            Input::Command(Command::Close { reason }) => {
                inner.on_closed(None, &reason);
            }
            Input::Command(Command::Shutdown) => {
                inner.on_shutdown();
                break;
            }
            #[cfg(test)]
            Input::Command(Command::Barrier(done)) => {
                let _ = done.send(());
            }
        }
    }

    debug!("Event loop terminated");
}

// ============================================================================
// TransactionStream
// ============================================================================

/// Response frames of one transaction.
///
/// Returned by [`StrestClient::send`].
#[derive(Debug)]
pub struct TransactionStream {
    request: Request,
    rx: mpsc::UnboundedReceiver<Result<Response>>,
}

impl TransactionStream {
    /// Returns the request as sent.
    #[inline]
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }
}

impl Stream for TransactionStream {
    type Item = Result<Response>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ============================================================================
// Tests
// ============================================================================
