//! In-memory transport for driving the client in tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};

use super::{Transport, TransportEvents, TransportHandle};

/// Records every handle the client opens.
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    sockets: Arc<Mutex<Vec<Arc<MockSocket>>>>,
}

/// One connect attempt, driven by the test.
pub(crate) struct MockSocket {
    pub url: Url,
    pub events: TransportEvents,
    sent: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl MockTransport {
    pub fn open_count(&self) -> usize {
        self.sockets.lock().len()
    }

    pub fn socket(&self, index: usize) -> Arc<MockSocket> {
        Arc::clone(&self.sockets.lock()[index])
    }

    pub fn last(&self) -> Arc<MockSocket> {
        let sockets = self.sockets.lock();
        Arc::clone(sockets.last().expect("no socket opened"))
    }
}

impl MockSocket {
    pub fn sent(&self) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .map(|text| serde_json::from_str(text).expect("client sent invalid json"))
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn open(&self, url: &Url, events: TransportEvents) -> Box<dyn TransportHandle> {
        let socket = Arc::new(MockSocket {
            url: url.clone(),
            events,
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });
        self.sockets.lock().push(Arc::clone(&socket));
        Box::new(MockHandle(socket))
    }
}

struct MockHandle(Arc<MockSocket>);

impl TransportHandle for MockHandle {
    fn send(&self, text: String) -> Result<()> {
        if self.0.is_closed() {
            return Err(Error::transport("mock socket closed"));
        }
        self.0.sent.lock().push(text);
        Ok(())
    }

    fn close(&self) {
        self.0.closed.store(true, Ordering::SeqCst);
    }

    fn is_ready(&self) -> bool {
        !self.0.is_closed()
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.0.closed.store(true, Ordering::SeqCst);
    }
}
