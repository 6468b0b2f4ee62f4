//! Error types for the STREST client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use strest_client::{Result, RequestOptions, StrestClient, TransactionCallbacks};
//!
//! fn example(client: &StrestClient) -> Result<()> {
//!     client.send_request(RequestOptions::new("/firehose"), TransactionCallbacks::new())?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Delivery |
//! |----------|----------|----------|
//! | Configuration | [`Error::Config`], [`Error::UnsupportedTransport`] | returned by `build()` |
//! | Connection | [`Error::NotConnected`], [`Error::ConnectionLost`], [`Error::Transport`] | returned / error callback |
//! | Protocol | [`Error::MalformedPayload`], [`Error::UnroutableResponse`] | logged, frame dropped |
//! | Correlation | [`Error::InvalidRequest`], [`Error::TransactionCollision`] | returned by `send_request` |
//! | External | [`Error::Json`], [`Error::Url`], [`Error::WebSocket`] | wrapped |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::client::ConnectionState;
use crate::identifiers::TxnId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// The URL scheme has no transport in this client.
    ///
    /// Only plain `ws://` endpoints are supported.
    #[error("Unsupported transport: {scheme}")]
    UnsupportedTransport {
        /// Scheme of the rejected URL.
        scheme: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Request sent while the connection is not open.
    #[error("Not connected (state: {state})")]
    NotConnected {
        /// State of the connection at the time of the call.
        state: ConnectionState,
    },

    /// Connection lost while the transaction was pending.
    ///
    /// Delivered to every pending transaction's error callback.
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// Why the connection went away.
        reason: String,
    },

    /// Transport handle refused a frame.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Inbound frame is not a well-formed STREST document.
    #[error("Malformed payload: {message}")]
    MalformedPayload {
        /// Description of the parse failure.
        message: String,
    },

    /// Inbound frame matched no pending transaction.
    #[error("Unroutable response: txn.id={}", describe_txn_id(.txn_id))]
    UnroutableResponse {
        /// Transaction id carried by the frame, if any.
        txn_id: Option<TxnId>,
    },

    /// Outbound request carries a `txn.id` that is not an unsigned integer.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What is wrong with the request.
        message: String,
    },

    /// A transaction with this id is already pending.
    #[error("Transaction collision: txn.id={txn_id}")]
    TransactionCollision {
        /// The duplicated transaction id.
        txn_id: TxnId,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

/// Renders an optional transaction id for error messages.
fn describe_txn_id(txn_id: &Option<TxnId>) -> String {
    txn_id.map_or_else(|| "<none>".to_string(), |id| id.to_string())
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an unsupported transport error.
    #[inline]
    pub fn unsupported_transport(scheme: impl Into<String>) -> Self {
        Self::UnsupportedTransport {
            scheme: scheme.into(),
        }
    }

    /// Creates a not connected error.
    #[inline]
    pub fn not_connected(state: ConnectionState) -> Self {
        Self::NotConnected { state }
    }

    /// Creates a connection lost error.
    #[inline]
    pub fn connection_lost(reason: impl Into<String>) -> Self {
        Self::ConnectionLost {
            reason: reason.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a malformed payload error.
    #[inline]
    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    /// Creates an unroutable response error.
    #[inline]
    pub fn unroutable_response(txn_id: Option<TxnId>) -> Self {
        Self::UnroutableResponse { txn_id }
    }

    /// Creates an invalid request error.
    #[inline]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a transaction collision error.
    #[inline]
    pub fn transaction_collision(txn_id: TxnId) -> Self {
        Self::TransactionCollision { txn_id }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected { .. }
                | Self::ConnectionLost { .. }
                | Self::Transport { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error concerns an inbound frame.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedPayload { .. } | Self::UnroutableResponse { .. } | Self::Json(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed once the reconnect loop has
    /// restored the connection.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotConnected { .. } | Self::ConnectionLost { .. } | Self::Transport { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
