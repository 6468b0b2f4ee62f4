//! Outbound STREST requests.
//!
//! # Format
//!
//! ```json
//! {
//!   "strest": {
//!     "method": "GET",
//!     "v": "2",
//!     "user-agent": "strest-rs/0.1.0",
//!     "uri": "/firehose",
//!     "params": { ... },
//!     "txn": { "id": 0, "accept": "multi" }
//!   }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::{TxnId, TxnIdGenerator};

use super::headers::HeaderTree;

// ============================================================================
// Constants
// ============================================================================

/// STREST protocol version sent in the `v` header.
pub const PROTOCOL_VERSION: &str = "2";

/// Client identifier sent in the `user-agent` header.
pub const USER_AGENT: &str = concat!("strest-rs/", env!("CARGO_PKG_VERSION"));

/// Method applied when none was given.
pub const DEFAULT_METHOD: &str = "GET";

/// Default `txn.accept` value: the client takes any number of frames.
pub const ACCEPT_MULTI: &str = "multi";

/// Header paths written by the client.
pub mod header {
    /// Request method.
    pub const METHOD: &str = "method";
    /// Protocol version.
    pub const VERSION: &str = "v";
    /// Client identifier.
    pub const USER_AGENT: &str = "user-agent";
    /// Target resource.
    pub const URI: &str = "uri";
    /// Request parameters.
    pub const PARAMS: &str = "params";
    /// Transaction id.
    pub const TXN_ID: &str = "txn.id";
    /// Accepted response mode.
    pub const TXN_ACCEPT: &str = "txn.accept";
    /// Transaction status (responses only).
    pub const TXN_STATUS: &str = "txn.status";
}

// ============================================================================
// RequestOptions
// ============================================================================

/// User-facing description of a request.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use strest_client::RequestOptions;
///
/// let options = RequestOptions::new("/search")
///     .with_method("POST")
///     .with_params(json!({"q": "rust"}));
/// assert_eq!(options.uri, "/search");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Target resource.
    pub uri: String,

    /// Request method. Not validated; `GET` is applied at send time if unset.
    pub method: Option<String>,

    /// Opaque request parameters.
    pub params: Option<Value>,
}

impl RequestOptions {
    /// Creates options targeting `uri`.
    #[inline]
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    /// Sets the request method.
    #[inline]
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Sets the request parameters.
    #[inline]
    #[must_use]
    pub fn with_params(mut self, params: impl Into<Value>) -> Self {
        self.params = Some(params.into());
        self
    }
}

// ============================================================================
// Request
// ============================================================================

/// A request from the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    /// All request headers.
    #[serde(rename = "strest")]
    headers: HeaderTree,
}

impl Request {
    /// Builds a request from options.
    ///
    /// `method` and `params` are only written when present.
    #[must_use]
    pub fn new(options: RequestOptions) -> Self {
        let mut headers = HeaderTree::new();
        if let Some(method) = options.method {
            headers.set(header::METHOD, method);
        }
        headers.set(header::VERSION, PROTOCOL_VERSION);
        headers.set(header::USER_AGENT, USER_AGENT);
        headers.set(header::URI, options.uri);
        if let Some(params) = options.params {
            headers.set(header::PARAMS, params);
        }
        Self { headers }
    }

    /// Fills in the transaction headers the server requires.
    ///
    /// Every header is only written when absent, so finalizing a request
    /// twice keeps its original transaction id. A new id is drawn from
    /// `ids` only when the request has none.
    pub fn finalize(&mut self, ids: &TxnIdGenerator) -> Option<TxnId> {
        self.headers.set_if_absent(header::METHOD, DEFAULT_METHOD);
        self.headers.set_if_absent(header::USER_AGENT, USER_AGENT);
        self.headers
            .set_if_absent_with(header::TXN_ID, || ids.next().as_u64());
        self.headers.set_if_absent(header::TXN_ACCEPT, ACCEPT_MULTI);
        self.txn_id()
    }

    /// Serializes the request to its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_wire(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns the transaction id, once assigned.
    #[must_use]
    pub fn txn_id(&self) -> Option<TxnId> {
        super::read_txn_id(&self.headers)
    }

    /// Returns the target resource.
    #[inline]
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.headers.get_str(header::URI)
    }

    /// Returns the request method.
    #[inline]
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.headers.get_str(header::METHOD)
    }

    /// Replaces the target resource.
    #[inline]
    pub fn set_uri(&mut self, uri: impl Into<String>) {
        self.headers.set(header::URI, uri.into());
    }

    /// Replaces the request method.
    #[inline]
    pub fn set_method(&mut self, method: impl Into<String>) {
        self.headers.set(header::METHOD, method.into());
    }

    /// Sets an arbitrary header.
    #[inline]
    pub fn set_header(&mut self, path: &str, value: impl Into<Value>) {
        self.headers.set(path, value);
    }

    /// Reads an arbitrary header.
    #[inline]
    #[must_use]
    pub fn header(&self, path: &str) -> Option<&Value> {
        self.headers.get(path)
    }

    /// Returns the header tree.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &HeaderTree {
        &self.headers
    }
}

impl From<RequestOptions> for Request {
    #[inline]
    fn from(options: RequestOptions) -> Self {
        Self::new(options)
    }
}

impl From<&str> for Request {
    #[inline]
    fn from(uri: &str) -> Self {
        Self::new(RequestOptions::new(uri))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_writes_base_headers() {
        let request = Request::new(
            RequestOptions::new("/echo")
                .with_method("PUT")
                .with_params(json!({"a": 1})),
        );

        assert_eq!(request.method(), Some("PUT"));
        assert_eq!(request.uri(), Some("/echo"));
        assert_eq!(request.header("v"), Some(&json!("2")));
        assert_eq!(request.header("user-agent"), Some(&json!(USER_AGENT)));
        assert_eq!(request.header("params"), Some(&json!({"a": 1})));
        assert!(request.txn_id().is_none());
    }

    #[test]
    fn test_new_omits_missing_method_and_params() {
        let request = Request::from("/x");

        assert!(request.method().is_none());
        assert!(request.header("params").is_none());
    }

    #[test]
    fn test_method_passes_through_unvalidated() {
        let request = Request::new(RequestOptions::new("/x").with_method("FETCH"));
        assert_eq!(request.method(), Some("FETCH"));
    }

    #[test]
    fn test_finalize_assigns_transaction_headers() {
        let ids = TxnIdGenerator::new();
        let mut request = Request::from("/x");

        let id = request.finalize(&ids);

        assert_eq!(id, Some(TxnId::new(0)));
        assert_eq!(request.method(), Some("GET"));
        assert_eq!(request.header("txn.accept"), Some(&json!("multi")));
    }

    #[test]
    fn test_finalize_twice_keeps_id() {
        let ids = TxnIdGenerator::new();
        let mut request = Request::from("/x");

        let first = request.finalize(&ids);
        let second = request.finalize(&ids);

        assert_eq!(first, second);
        assert_eq!(ids.peek(), TxnId::new(1));
    }

    #[test]
    fn test_finalize_honors_preset_headers() {
        let ids = TxnIdGenerator::new();
        let mut request = Request::new(RequestOptions::new("/x").with_method("DELETE"));
        request.set_header("txn.accept", "single");
        request.set_header("txn.id", 99);

        assert_eq!(request.finalize(&ids), Some(TxnId::new(99)));
        assert_eq!(request.method(), Some("DELETE"));
        assert_eq!(request.header("txn.accept"), Some(&json!("single")));
        assert_eq!(ids.peek(), TxnId::new(0));
    }

    #[test]
    fn test_wire_form() {
        let ids = TxnIdGenerator::new();
        let mut request = Request::from("/firehose");
        request.finalize(&ids);

        let wire: Value = serde_json::from_str(&request.to_wire().expect("serialize"))
            .expect("valid json");

        assert_eq!(
            wire,
            json!({
                "strest": {
                    "method": "GET",
                    "v": "2",
                    "user-agent": USER_AGENT,
                    "uri": "/firehose",
                    "txn": {"id": 0, "accept": "multi"}
                }
            })
        );
    }

    #[test]
    fn test_setters() {
        let mut request = Request::from("/a");
        request.set_uri("/b");
        request.set_method("POST");

        assert_eq!(request.uri(), Some("/b"));
        assert_eq!(request.method(), Some("POST"));
    }
}
