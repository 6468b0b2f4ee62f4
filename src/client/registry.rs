//! Pending transactions keyed by transaction id.
//!
//! The registry correlates inbound response frames with the callbacks
//! registered when the request was sent. An entry lives until its
//! `complete` frame arrives or the connection is lost.
//!
//! Callbacks always run with the registry lock released, so a callback may
//! send further requests.

// ============================================================================
// Imports
// ============================================================================

use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::TxnId;
use crate::protocol::Response;

// ============================================================================
// Types
// ============================================================================

/// Called for every response frame of a transaction.
pub type MessageCallback = Box<dyn Fn(&Response) + Send + Sync>;

/// Called once when a transaction completes.
pub type CompleteCallback = Box<dyn Fn(TxnId) + Send + Sync>;

/// Called once when a transaction is abandoned.
pub type ErrorCallback = Box<dyn Fn(&Error) + Send + Sync>;

/// Map of transaction ids to their callbacks.
type TransactionMap = FxHashMap<TxnId, Arc<TransactionCallbacks>>;

// ============================================================================
// TransactionCallbacks
// ============================================================================

/// Callback set registered for one transaction.
///
/// Every callback is optional.
///
/// # Example
///
/// ```
/// use strest_client::TransactionCallbacks;
///
/// let callbacks = TransactionCallbacks::new()
///     .on_message(|response| println!("frame: {response}"))
///     .on_complete(|id| println!("txn {id} done"))
///     .on_error(|err| eprintln!("txn failed: {err}"));
/// ```
#[derive(Default)]
pub struct TransactionCallbacks {
    on_message: Option<MessageCallback>,
    on_complete: Option<CompleteCallback>,
    on_error: Option<ErrorCallback>,
}

impl TransactionCallbacks {
    /// Creates an empty callback set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-frame callback.
    #[must_use]
    pub fn on_message(mut self, f: impl Fn(&Response) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Box::new(f));
        self
    }

    /// Sets the completion callback.
    #[must_use]
    pub fn on_complete(mut self, f: impl Fn(TxnId) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Sets the error callback.
    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    fn message(&self, response: &Response) {
        if let Some(f) = &self.on_message {
            f(response);
        }
    }

    fn complete(&self, id: TxnId) {
        if let Some(f) = &self.on_complete {
            f(id);
        }
    }

    fn error(&self, err: &Error) {
        if let Some(f) = &self.on_error {
            f(err);
        }
    }
}

impl fmt::Debug for TransactionCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionCallbacks")
            .field("on_message", &self.on_message.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Outcome of routing one response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Delivered; the transaction expects more frames.
    Delivered(TxnId),
    /// Delivered; the transaction is finished and removed.
    Completed(TxnId),
    /// No pending transaction matched; the frame was dropped.
    Unroutable(Option<TxnId>),
}

// ============================================================================
// TransactionRegistry
// ============================================================================

/// Pending transactions of one client.
#[derive(Debug, Default)]
pub struct TransactionRegistry {
    entries: Mutex<TransactionMap>,
}

impl TransactionRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers callbacks for a new transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransactionCollision`] if `id` is already pending.
    /// The existing entry is left untouched.
    pub fn register(&self, id: TxnId, callbacks: TransactionCallbacks) -> Result<()> {
        match self.entries.lock().entry(id) {
            Entry::Occupied(_) => {
                error!(txn_id = %id, "Transaction id already pending");
                Err(Error::transaction_collision(id))
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(callbacks));
                trace!(txn_id = %id, "Transaction registered");
                Ok(())
            }
        }
    }

    /// Routes a response frame to its transaction.
    ///
    /// A `complete` frame removes the entry before its callbacks run, so a
    /// later frame with the same id is unroutable.
    pub fn dispatch(&self, response: &Response) -> Dispatch {
        let Some(id) = response.txn_id() else {
            warn!(error = %Error::unroutable_response(None), %response, "Dropping frame");
            return Dispatch::Unroutable(None);
        };

        let complete = response.is_complete();
        let callbacks = {
            let mut entries = self.entries.lock();
            if complete {
                entries.remove(&id)
            } else {
                entries.get(&id).cloned()
            }
        };

        let Some(callbacks) = callbacks else {
            warn!(error = %Error::unroutable_response(Some(id)), %response, "Dropping frame");
            return Dispatch::Unroutable(Some(id));
        };

        callbacks.message(response);

        if complete {
            callbacks.complete(id);
            trace!(txn_id = %id, "Transaction complete");
            Dispatch::Completed(id)
        } else {
            Dispatch::Delivered(id)
        }
    }

    /// Fails every pending transaction and clears the registry.
    ///
    /// Entries are drained before any callback runs; transactions registered
    /// afterwards are not affected. Returns the number of failed entries.
    pub fn fail_all(&self, reason: &str) -> usize {
        let drained: Vec<_> = self.entries.lock().drain().collect();
        if drained.is_empty() {
            return 0;
        }

        let err = Error::connection_lost(reason);
        for (id, callbacks) in &drained {
            trace!(txn_id = %id, "Failing pending transaction");
            callbacks.error(&err);
        }

        drained.len()
    }

    /// Returns the number of pending transactions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns `true` if `id` is pending.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: TxnId) -> bool {
        self.entries.lock().contains_key(&id)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counts {
        messages: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
    }

    fn counting(counts: &Arc<Counts>) -> TransactionCallbacks {
        let (m, c, e) = (Arc::clone(counts), Arc::clone(counts), Arc::clone(counts));
        TransactionCallbacks::new()
            .on_message(move |_| {
                m.messages.fetch_add(1, Ordering::SeqCst);
            })
            .on_complete(move |_| {
                c.completes.fetch_add(1, Ordering::SeqCst);
            })
            .on_error(move |_| {
                e.errors.fetch_add(1, Ordering::SeqCst);
            })
    }

    fn frame(id: u64, status: Option<&str>) -> Response {
        let raw = match status {
            Some(status) => format!(r#"{{"strest":{{"txn":{{"id":{id},"status":"{status}"}}}}}}"#),
            None => format!(r#"{{"strest":{{"txn":{{"id":{id}}}}}}}"#),
        };
        Response::parse(raw).expect("valid frame")
    }

    #[test]
    fn test_register_rejects_duplicate() {
        let registry = TransactionRegistry::new();
        let first = Arc::new(Counts::default());

        assert!(registry.register(TxnId::new(1), counting(&first)).is_ok());
        let err = registry
            .register(TxnId::new(1), TransactionCallbacks::new())
            .expect_err("duplicate");
        assert!(matches!(err, Error::TransactionCollision { .. }));

        // The original callbacks still receive the frame.
        registry.dispatch(&frame(1, None));
        assert_eq!(first.messages.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_streaming_frames_keep_entry() {
        let registry = TransactionRegistry::new();
        let counts = Arc::new(Counts::default());
        registry.register(TxnId::new(3), counting(&counts)).expect("register");

        assert_eq!(registry.dispatch(&frame(3, None)), Dispatch::Delivered(TxnId::new(3)));
        assert_eq!(
            registry.dispatch(&frame(3, Some("continue"))),
            Dispatch::Delivered(TxnId::new(3))
        );
        assert!(registry.contains(TxnId::new(3)));
        assert_eq!(counts.messages.load(Ordering::SeqCst), 2);
        assert_eq!(counts.completes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_complete_removes_entry() {
        let registry = TransactionRegistry::new();
        let counts = Arc::new(Counts::default());
        registry.register(TxnId::new(0), counting(&counts)).expect("register");

        assert_eq!(
            registry.dispatch(&frame(0, Some("complete"))),
            Dispatch::Completed(TxnId::new(0))
        );
        assert!(registry.is_empty());

        // A late frame for the same id is dropped.
        assert_eq!(
            registry.dispatch(&frame(0, Some("complete"))),
            Dispatch::Unroutable(Some(TxnId::new(0)))
        );
        assert_eq!(counts.messages.load(Ordering::SeqCst), 1);
        assert_eq!(counts.completes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_frame_without_id_is_unroutable() {
        let registry = TransactionRegistry::new();
        let response = Response::parse(r#"{"strest":{}}"#).expect("parse");
        assert_eq!(registry.dispatch(&response), Dispatch::Unroutable(None));
    }

    #[test]
    fn test_fail_all_notifies_each_once() {
        let registry = TransactionRegistry::new();
        let counts: Vec<_> = (0..3).map(|_| Arc::new(Counts::default())).collect();
        for (i, c) in counts.iter().enumerate() {
            registry.register(TxnId::new(i as u64), counting(c)).expect("register");
        }

        assert_eq!(registry.fail_all("Connection closed"), 3);
        assert!(registry.is_empty());
        assert_eq!(registry.fail_all("again"), 0);

        for (i, c) in counts.iter().enumerate() {
            let id = TxnId::new(i as u64);
            assert_eq!(
                registry.dispatch(&frame(i as u64, Some("complete"))),
                Dispatch::Unroutable(Some(id))
            );
            assert_eq!(c.errors.load(Ordering::SeqCst), 1);
            assert_eq!(c.messages.load(Ordering::SeqCst), 0);
            assert_eq!(c.completes.load(Ordering::SeqCst), 0);
        }
    }

    #[test]
    fn test_fail_all_passes_connection_lost() {
        let registry = TransactionRegistry::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        registry
            .register(
                TxnId::new(9),
                TransactionCallbacks::new()
                    .on_error(move |err| *sink.lock() = Some(err.to_string())),
            )
            .expect("register");

        registry.fail_all("Connection closed");
        assert_eq!(seen.lock().as_deref(), Some("Connection lost: Connection closed"));
    }

    #[test]
    fn test_registration_during_fail_all_survives() {
        let registry = Arc::new(TransactionRegistry::new());
        let late = Arc::new(Counts::default());
        let (inner, late_counts) = (Arc::clone(&registry), Arc::clone(&late));
        registry
            .register(
                TxnId::new(0),
                TransactionCallbacks::new().on_error(move |_| {
                    inner
                        .register(TxnId::new(1), counting(&late_counts))
                        .expect("register from error callback");
                }),
            )
            .expect("register");

        assert_eq!(registry.fail_all("Connection closed"), 1);

        assert!(registry.contains(TxnId::new(1)));
        assert_eq!(registry.len(), 1);
        assert_eq!(late.errors.load(Ordering::SeqCst), 0);

        assert_eq!(
            registry.dispatch(&frame(1, Some("complete"))),
            Dispatch::Completed(TxnId::new(1))
        );
        assert_eq!(late.messages.load(Ordering::SeqCst), 1);
        assert_eq!(late.completes.load(Ordering::SeqCst), 1);
        assert_eq!(late.errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_callbacks_may_register_during_dispatch() {
        let registry = Arc::new(TransactionRegistry::new());
        let inner = Arc::clone(&registry);
        registry
            .register(
                TxnId::new(1),
                TransactionCallbacks::new().on_complete(move |_| {
                    inner
                        .register(TxnId::new(2), TransactionCallbacks::new())
                        .expect("register from callback");
                }),
            )
            .expect("register");

        registry.dispatch(&frame(1, Some("complete")));
        assert!(registry.contains(TxnId::new(2)));
        assert_eq!(registry.len(), 1);
    }
}
