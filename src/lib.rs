//! STREST client - streaming request/response over a persistent connection.
//!
//! STREST carries REST-style requests over a single WebSocket. Each request
//! opens a transaction identified by an integer id, and the server answers
//! with any number of response frames carrying that id. The frame whose
//! `txn.status` is `complete` ends the transaction.
//!
//! # Architecture
//!
//! - **Client**: owns one connection at a time and routes every inbound
//!   frame to its transaction
//! - **Event loop**: one tokio task per client handles transport events,
//!   ping probes and reconnects in order
//! - **Transport**: pluggable; WebSocket via `tokio-tungstenite` by default
//!
//! # Quick Start
//!
//! ```no_run
//! use strest_client::{RequestOptions, Result, StrestClient, TransactionCallbacks};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = StrestClient::builder()
//!         .url("ws://localhost:8000/strest")
//!         .ping("/ping")
//!         .build()?;
//!
//!     client.connect();
//!     // ... wait for on_open, then:
//!     client.send_request(
//!         RequestOptions::new("/firehose").with_params(serde_json::json!({"limit": 10})),
//!         TransactionCallbacks::new()
//!             .on_message(|response| println!("{response}"))
//!             .on_complete(|id| println!("transaction {id} complete")),
//!     )?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`StrestClient`], its builder and configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Transaction ids and their generator |
//! | [`protocol`] | Request and response messages |
//! | [`transport`] | Transport traits and the WebSocket transport |

// ============================================================================
// Modules
// ============================================================================

/// STREST client.
///
/// Use [`StrestClient::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Transaction identifiers.
pub mod identifiers;

/// STREST message types.
///
/// Requests, responses and their nested header trees.
pub mod protocol;

/// Transport layer.
///
/// Implement [`transport::Transport`] to run the client over something
/// other than WebSocket.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    ClientBuilder, ClientConfig, ConnectionState, Dispatch, StrestClient, TransactionCallbacks,
    TransactionRegistry, TransactionStream,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{TxnId, TxnIdGenerator};

// Protocol types
pub use protocol::{HeaderTree, Message, Request, RequestOptions, Response};
