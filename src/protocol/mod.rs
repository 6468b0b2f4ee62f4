//! STREST message types.
//!
//! Requests and responses share one representation: a [`HeaderTree`]
//! addressed with dot-separated paths, wrapped in a `{"strest": ...}`
//! JSON document on the wire.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`Request`] | Client → Server | Opens a transaction |
//! | [`Response`] | Server → Client | One frame of a transaction |
//!
//! A transaction may receive any number of response frames. The frame whose
//! `txn.status` is `complete` ends it.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `headers` | Dot-path header tree |
//! | `request` | Request building, finalization and serialization |
//! | `response` | Response parsing |

// ============================================================================
// Submodules
// ============================================================================

/// Addressable header tree.
pub mod headers;

/// Outbound request messages.
pub mod request;

/// Inbound response messages.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use headers::HeaderTree;
pub use request::{
    ACCEPT_MULTI, DEFAULT_METHOD, PROTOCOL_VERSION, Request, RequestOptions, USER_AGENT,
};
pub use response::{Response, STATUS_COMPLETE};

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::identifiers::TxnId;

// ============================================================================
// Message
// ============================================================================

/// Either direction of STREST message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Client to server.
    Request(Request),
    /// Server to client.
    Response(Response),
}

impl Message {
    /// Returns the header tree of either variant.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &HeaderTree {
        match self {
            Self::Request(request) => request.headers(),
            Self::Response(response) => response.headers(),
        }
    }

    /// Reads a header of either variant.
    #[inline]
    #[must_use]
    pub fn header(&self, path: &str) -> Option<&Value> {
        self.headers().get(path)
    }

    /// Returns the transaction id of either variant.
    #[inline]
    #[must_use]
    pub fn txn_id(&self) -> Option<TxnId> {
        read_txn_id(self.headers())
    }
}

impl From<Request> for Message {
    #[inline]
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

impl From<Response> for Message {
    #[inline]
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

/// Reads `txn.id` as an integer, an integral float or a numeric string.
pub(crate) fn read_txn_id(headers: &HeaderTree) -> Option<TxnId> {
    match headers.get(request::header::TXN_ID)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                    .map(|f| f as u64)
            })
            .map(TxnId::new),
        Value::String(s) => s.trim().parse().ok().map(TxnId::new),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
