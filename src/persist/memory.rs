use super::PersistentStore;
use crate::error::PersistError;
use crate::hash::FastHashBuilder;
use papaya::HashMap as PapayaHashMap;

/// In-process store, mainly for tests and ephemeral sessions.
///
/// Backed by papaya's lock-free map, so listeners writing from several
/// threads never contend on a lock.
pub struct MemoryStore {
    items: PapayaHashMap<String, String, FastHashBuilder>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            items: PapayaHashMap::with_hasher(FastHashBuilder),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistentStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.items.pin().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), PersistError> {
        self.items.pin().insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), PersistError> {
        self.items.pin().remove(key);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("len", &self.items.len())
            .finish()
    }
}
