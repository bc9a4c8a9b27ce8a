//! Device-local persistence.
//!
//! Cache snapshots survive process restarts through a small string
//! key-value store, mirroring the browser-local storage the surrounding
//! application runs on. Entries are process-local and never shared across
//! client instances.

use std::collections::HashMap;
use std::sync::RwLock;

use cellar_core::LocalCacheError;

/// Device-local string key-value storage.
///
/// Implementations are synchronous; values are opaque strings (the caches
/// serialize JSON into them). A failed read must surface as an error, not
/// as an absent key, so callers can distinguish "no snapshot" from "broken
/// storage".
pub trait LocalStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, LocalCacheError>;

    fn write(&self, key: &str, value: &str) -> Result<(), LocalCacheError>;

    fn remove(&self, key: &str) -> Result<(), LocalCacheError>;
}

/// In-memory local store for tests and ephemeral clients.
#[derive(Default)]
pub struct InMemoryLocalStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .expect("local store lock should not be poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalStore for InMemoryLocalStore {
    fn read(&self, key: &str) -> Result<Option<String>, LocalCacheError> {
        Ok(self
            .entries
            .read()
            .map_err(|_| LocalCacheError::Io {
                key: key.to_string(),
                reason: "lock poisoned".to_string(),
            })?
            .get(key)
            .cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), LocalCacheError> {
        self.entries
            .write()
            .map_err(|_| LocalCacheError::Io {
                key: key.to_string(),
                reason: "lock poisoned".to_string(),
            })?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), LocalCacheError> {
        self.entries
            .write()
            .map_err(|_| LocalCacheError::Io {
                key: key.to_string(),
                reason: "lock poisoned".to_string(),
            })?
            .remove(key);
        Ok(())
    }
}
