//! Connection-wide public data and its per-exchange copies.
//!
//! A [`PublicStore`] belongs to a session and is shared by every exchange on
//! that connection. Exchanges never see it live: when a context is reset it
//! copies the store into its own [`Scope`], and from then on the two are
//! independent. Snapshots take the read lock, so many exchanges can copy at
//! once while writes stay rare.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

/// Exchange-private key/value data.
pub type Scope = HashMap<String, Value>;

/// Session-wide key/value data, safe for concurrent access.
#[derive(Debug, Default)]
pub struct PublicStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl PublicStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous one.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.write().insert(key.into(), value.into())
    }

    /// Get a copy of a value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    /// Remove a value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries.write().remove(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy every entry into `scope`, overwriting keys that already exist.
    ///
    /// Returns the number of entries copied.
    pub fn copy_into(&self, scope: &mut Scope) -> usize {
        let entries = self.entries.read();
        if entries.is_empty() {
            return 0;
        }
        scope.reserve(entries.len());
        for (key, value) in entries.iter() {
            scope.insert(key.clone(), value.clone());
        }
        entries.len()
    }
}
