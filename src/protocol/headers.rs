//! Addressable header tree shared by requests and responses.
//!
//! Headers are nested JSON objects addressed with dot-separated paths:
//! `txn.id` names the `id` member of the `txn` object.
//!
//! # Example
//!
//! ```
//! use strest_client::HeaderTree;
//!
//! let mut headers = HeaderTree::new();
//! headers.set("txn.id", 7);
//! assert_eq!(headers.get("txn.id").and_then(|v| v.as_u64()), Some(7));
//! assert!(headers.get("txn.status").is_none());
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Constants
// ============================================================================

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';

// ============================================================================
// HeaderTree
// ============================================================================

/// Nested mapping of header fields.
///
/// Writes create intermediate objects on demand; reads of a missing path
/// return `None` rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderTree {
    root: Map<String, Value>,
}

impl HeaderTree {
    /// Creates an empty header tree.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `value` at `path`.
    ///
    /// Any intermediate segment that is missing, or holds a non-object
    /// value, is replaced by an empty object.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
        insert_at(&mut self.root, &segments, value.into());
    }

    /// Assigns `value` at `path` unless a non-null value is already there.
    ///
    /// Returns `true` when the write happened.
    pub fn set_if_absent(&mut self, path: &str, value: impl Into<Value>) -> bool {
        self.set_if_absent_with(path, || value)
    }

    /// Lazy form of [`set_if_absent`](Self::set_if_absent).
    ///
    /// `make` only runs when the path is absent.
    pub fn set_if_absent_with<V, F>(&mut self, path: &str, make: F) -> bool
    where
        V: Into<Value>,
        F: FnOnce() -> V,
    {
        if self.contains(path) {
            return false;
        }
        self.set(path, make());
        true
    }

    /// Returns the value at `path`.
    ///
    /// `None` as soon as a segment is missing or an intermediate value is
    /// not an object.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split(PATH_SEPARATOR);
        let mut node = self.root.get(segments.next()?)?;
        for segment in segments {
            node = node.as_object()?.get(segment)?;
        }
        Some(node)
    }

    /// Returns the string at `path`, if it holds one.
    #[inline]
    #[must_use]
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Returns `true` if a non-null value is stored at `path`.
    #[inline]
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some_and(|v| !v.is_null())
    }

    /// Returns `true` if the tree has no top-level fields.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Returns the top-level mapping.
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Converts the tree into a JSON object value.
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }
}

impl From<Map<String, Value>> for HeaderTree {
    #[inline]
    fn from(root: Map<String, Value>) -> Self {
        Self { root }
    }
}

/// Writes `value` at the path described by `segments` below `node`.
fn insert_at(node: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [leaf] => {
            node.insert((*leaf).to_string(), value);
        }
        [head, rest @ ..] => {
            let child = node
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match child {
                Value::Object(map) => insert_at(map, rest, value),
                leaf => {
                    let mut map = Map::new();
                    insert_at(&mut map, rest, value);
                    *leaf = Value::Object(map);
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
