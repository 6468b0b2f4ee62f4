//! Inbound STREST responses.
//!
//! # Format
//!
//! ```json
//! {
//!   "strest": {
//!     "txn": { "id": 0, "status": "continue" },
//!     ...
//!   },
//!   "content": { ... }
//! }
//! ```
//!
//! Only `txn.id` and `txn.status` drive correlation; everything else is
//! passed to the caller untouched.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::TxnId;

use super::headers::HeaderTree;
use super::request::header;

// ============================================================================
// Constants
// ============================================================================

/// Top-level member holding the header tree.
const HEADERS_MEMBER: &str = "strest";

/// Top-level member holding the response body.
const CONTENT_MEMBER: &str = "content";

/// The only terminal `txn.status` value.
pub const STATUS_COMPLETE: &str = "complete";

// ============================================================================
// Response
// ============================================================================

/// A response frame from the server.
///
/// Keeps the raw payload so it can be echoed verbatim in diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Parsed `strest` headers.
    headers: HeaderTree,

    /// Top-level members other than the headers.
    body: Map<String, Value>,

    /// Payload as received.
    raw: String,
}

impl Response {
    /// Parses a wire payload.
    ///
    /// A document without a `strest` member parses to an empty header tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPayload`] if `raw` is not a JSON object,
    /// or its `strest` member is not an object.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let document: Value = serde_json::from_str(&raw)
            .map_err(|e| Error::malformed_payload(e.to_string()))?;

        let Value::Object(mut body) = document else {
            return Err(Error::malformed_payload("document is not a JSON object"));
        };

        let headers = match body.remove(HEADERS_MEMBER) {
            None => HeaderTree::new(),
            Some(Value::Object(map)) => HeaderTree::from(map),
            Some(_) => {
                return Err(Error::malformed_payload(
                    "`strest` member is not a JSON object",
                ));
            }
        };

        Ok(Self { headers, body, raw })
    }

    /// Returns the transaction id the frame belongs to.
    #[inline]
    #[must_use]
    pub fn txn_id(&self) -> Option<TxnId> {
        super::read_txn_id(&self.headers)
    }

    /// Returns the `txn.status` header.
    #[inline]
    #[must_use]
    pub fn txn_status(&self) -> Option<&str> {
        self.headers.get_str(header::TXN_STATUS)
    }

    /// Returns `true` if this is the last frame of its transaction.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.txn_status() == Some(STATUS_COMPLETE)
    }

    /// Returns the `content` member, if any.
    #[inline]
    #[must_use]
    pub fn content(&self) -> Option<&Value> {
        self.body.get(CONTENT_MEMBER)
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

    /// Returns the payload exactly as received.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
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
    fn test_parse_complete_frame() {
        let raw = r#"{"strest":{"txn":{"id":0,"status":"complete"}}}"#;
        let response = Response::parse(raw).expect("parse");

        assert_eq!(response.txn_id(), Some(TxnId::new(0)));
        assert_eq!(response.txn_status(), Some("complete"));
        assert!(response.is_complete());
        assert_eq!(response.raw(), raw);
        assert_eq!(response.to_string(), raw);
    }

    #[test]
    fn test_parse_streaming_frame_with_content() {
        let raw = r#"{
            "strest": {"txn": {"id": 4, "status": "continue"}, "status": {"code": 200}},
            "content": {"tweet": "hello"}
        }"#;
        let response = Response::parse(raw).expect("parse");

        assert!(!response.is_complete());
        assert_eq!(response.header("status.code"), Some(&json!(200)));
        assert_eq!(response.content(), Some(&json!({"tweet": "hello"})));
    }

    #[test]
    fn test_missing_status_is_not_complete() {
        let response = Response::parse(r#"{"strest":{"txn":{"id":1}}}"#).expect("parse");
        assert!(response.txn_status().is_none());
        assert!(!response.is_complete());
    }

    #[test]
    fn test_string_txn_id_correlates() {
        let response = Response::parse(r#"{"strest":{"txn":{"id":"12"}}}"#).expect("parse");
        assert_eq!(response.txn_id(), Some(TxnId::new(12)));
    }

    #[test]
    fn test_missing_headers_parse_empty() {
        let response = Response::parse(r#"{"content":"x"}"#).expect("parse");
        assert!(response.headers().is_empty());
        assert!(response.txn_id().is_none());
    }

    #[test]
    fn test_malformed_payloads() {
        for raw in ["not json", "[1,2]", r#"{"strest": 3}"#, ""] {
            let err = Response::parse(raw).expect_err("should fail");
            assert!(matches!(err, Error::MalformedPayload { .. }), "{raw}: {err}");
        }
    }
}
