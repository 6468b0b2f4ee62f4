//! Type-safe identifiers for STREST transactions.
//!
//! [`TxnId`] wraps the integer carried in the `txn.id` header so that
//! transaction ids cannot be confused with other integers. Ids are minted
//! by a [`TxnIdGenerator`], which is owned by a client and may be shared
//! between clients that must not collide.
//!
//! # Example
//!
//! ```
//! use strest_client::{TxnId, TxnIdGenerator};
//!
//! let ids = TxnIdGenerator::new();
//! assert_eq!(ids.next(), TxnId::new(0));
//! assert_eq!(ids.next(), TxnId::new(1));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// TxnId
// ============================================================================

/// Identifier correlating a request with its response frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxnId(u64);

impl TxnId {
    /// Creates a transaction id from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for TxnId {
    #[inline]
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// TxnIdGenerator
// ============================================================================

/// Monotonic source of transaction ids.
///
/// Cloning the generator shares the underlying counter, so every clone
/// draws from the same sequence. The counter wraps at `u64::MAX`.
#[derive(Debug, Clone, Default)]
pub struct TxnIdGenerator {
    next: Arc<AtomicU64>,
}

impl TxnIdGenerator {
    /// Creates a generator starting at `0`.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator whose first id is `first`.
    #[inline]
    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(first)),
        }
    }

    /// Mints the next transaction id.
    #[inline]
    pub fn next(&self) -> TxnId {
        TxnId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the id the next call to [`next`](Self::next) will mint.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> TxnId {
        TxnId(self.next.load(Ordering::Relaxed))
    }
}

// ============================================================================
// Tests
// ============================================================================
