//! Keyed persistence for bindables.
//!
//! [`make_persistent`] restores a bindable from a [`PersistentStore`] and then
//! writes every new value back under the same key. Values are stored as JSON
//! text, so any `T: Serialize + DeserializeOwned` works.
//!
//! ```ignore
//! let store: Arc<dyn PersistentStore> = Arc::new(FileStore::new("./state"));
//! let theme = make_persistent(&Bindable::new("light".to_string()), "theme", store)?;
//! theme.set("dark".into()); // written to ./state/theme.json
//! ```

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::Bindable;
use crate::error::PersistError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// A string-keyed text store.
pub trait PersistentStore: Send + Sync {
    /// Stored text for `key`, or `None` if nothing was stored.
    fn get_item(&self, key: &str) -> Result<Option<String>, PersistError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: String) -> Result<(), PersistError>;

    /// Forget `key`; removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), PersistError>;
}

/// Restore `bindable` from `store` and keep the store up to date.
///
/// If a value is stored under `unique_key` it is decoded and applied with
/// [`Bindable::set`], so listeners already registered see it. From then on
/// every notification writes the current value back. Write failures inside
/// that listener cannot be returned to anyone and are logged instead.
///
/// Returns a handle to the same bindable for chaining.
pub fn make_persistent<T>(
    bindable: &Bindable<T>,
    unique_key: &str,
    store: Arc<dyn PersistentStore>,
) -> Result<Bindable<T>, PersistError>
where
    T: Clone + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    if let Some(text) = store.get_item(unique_key)? {
        let restored: T =
            serde_json::from_str(&text).map_err(|source| PersistError::Deserialize {
                key: unique_key.to_string(),
                source,
            })?;
        debug!(key = unique_key, "restored persisted value");
        bindable.set(restored);
    }

    let key = unique_key.to_string();
    bindable.subscribe(move |value: &T| {
        if let Err(err) = write_value(store.as_ref(), &key, value) {
            warn!(key = %key, error = %err, "failed to persist value");
        }
    });

    Ok(bindable.clone())
}

fn write_value<T: Serialize>(
    store: &dyn PersistentStore,
    key: &str,
    value: &T,
) -> Result<(), PersistError> {
    let text = serde_json::to_string(value).map_err(|source| PersistError::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.set_item(key, text)
}
