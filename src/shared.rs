use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Shared, mutable value whose equality is identity.
///
/// Storing a `Shared<U>` in a [`Bindable`](crate::Bindable) gives reference
/// semantics: setting a clone of the same handle is an equal-value no-op,
/// and editing the contents in place does not notify anyone until
/// [`Bindable::trigger`](crate::Bindable::trigger) is called.
///
/// ```ignore
/// let items = Bindable::new(Shared::new(vec!["a".to_string()]));
/// items.with(|list| list.write().push("b".into()));
/// items.trigger(); // listeners see ["a", "b"]
/// ```
pub struct Shared<U> {
    cell: Arc<RwLock<U>>,
}

impl<U> Shared<U> {
    /// Wrap a value in a fresh shared cell.
    pub fn new(value: U) -> Self {
        Self {
            cell: Arc::new(RwLock::new(value)),
        }
    }

    /// Lock for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, U> {
        self.cell.read()
    }

    /// Lock for in-place mutation.
    pub fn write(&self) -> RwLockWriteGuard<'_, U> {
        self.cell.write()
    }

    /// Whether both handles point at the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<U: Clone> Shared<U> {
    /// Clone the contents out of the cell.
    pub fn snapshot(&self) -> U {
        self.cell.read().clone()
    }
}

impl<U> Clone for Shared<U> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<U> PartialEq for Shared<U> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<U> Eq for Shared<U> {}

impl<U: Default> Default for Shared<U> {
    fn default() -> Self {
        Self::new(U::default())
    }
}

impl<U: fmt::Debug> fmt::Debug for Shared<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Shared").field(&*self.cell.read()).finish()
    }
}

impl<U: Serialize> Serialize for Shared<U> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.cell.read().serialize(serializer)
    }
}

impl<'de, U: Deserialize<'de>> Deserialize<'de> for Shared<U> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        U::deserialize(deserializer).map(Shared::new)
    }
}
