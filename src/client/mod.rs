//! STREST client.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`StrestClient`] | Connection lifecycle and request dispatch |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ClientConfig`] | Endpoint, keepalive and interval settings |
//! | [`TransactionCallbacks`] | Per-transaction response handlers |
//! | [`TransactionRegistry`] | Routes response frames to transactions |
//! | [`TransactionStream`] | Response frames as a `Stream` |
//!
//! # Example
//!
//! ```no_run
//! use strest_client::{RequestOptions, StrestClient};
//! use futures_util::StreamExt;
//!
//! # async fn example() -> strest_client::Result<()> {
//! let client = StrestClient::builder()
//!     .url("ws://localhost:8000/strest")
//!     .build()?;
//! client.connect();
//!
//! // ... once open:
//! let mut frames = client.send(RequestOptions::new("/firehose"))?;
//! while let Some(frame) = frames.next().await {
//!     println!("{}", frame?);
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Client configuration.
pub mod config;

/// Core client implementation.
pub mod core;

/// Pending transaction bookkeeping.
pub mod registry;

/// Recurring ping and reconnect tasks.
mod timer;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use config::{ClientConfig, DEFAULT_PING_INTERVAL, DEFAULT_RECONNECT_INTERVAL};
pub use core::{CloseCallback, ConnectionState, OpenCallback, StrestClient, TransactionStream};
pub use registry::{Dispatch, TransactionCallbacks, TransactionRegistry};
