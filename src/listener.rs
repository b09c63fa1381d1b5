// Listener storage for a single bindable
//
// Each bindable owns one ListenerList. Slots are either Live (id + callback)
// or Removed (tombstone). Removal only tombstones a slot; the notification
// pass walks the list backwards by index and physically drops tombstones as it
// meets them. Walking backwards means a compaction at index i only shifts
// slots the pass has already visited, and listeners appended mid-pass land
// beyond the starting index.

use std::fmt;
use std::mem;
use std::sync::Arc;

type Callback<T> = dyn Fn(&T, &T) + Send + Sync;

/// Identifier handed out by [`Bindable::subscribe`](crate::Bindable::subscribe).
///
/// Ids are unique per bindable and increase monotonically; an id is never
/// reissued to another callback.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Raw numeric value of this id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A callback handle compared by identity.
///
/// Cloning a `Listener` yields the same callback; [`Bindable::unbind`](crate::Bindable::unbind)
/// matches on that identity, so keep a clone of the handle you bound if you
/// want to remove it later.
///
/// The callback receives `(value, previous)`. On a manual trigger or an
/// immediate fire both arguments are the current value.
pub struct Listener<T> {
    callback: Arc<Callback<T>>,
}

impl<T> Listener<T> {
    /// Wrap a callback that receives both the new and the previous value.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(f),
        }
    }

    /// Wrap a callback that only cares about the new value.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self::new(move |value, _previous| f(value))
    }

    /// Invoke the callback.
    pub fn call(&self, value: &T, previous: &T) {
        (self.callback)(value, previous);
    }

    /// Whether both handles refer to the same callback.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<T> PartialEq for Listener<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for Listener<T> {}

impl<T> fmt::Debug for Listener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("callback", &Arc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

enum Slot<T> {
    Live { id: ListenerId, listener: Listener<T> },
    Removed,
}

/// Result of looking at one slot during a notification pass.
pub(crate) enum Visit<T> {
    /// The slot holds a live listener; a clone of it is returned so the
    /// caller can invoke it after releasing the list lock.
    Live(Listener<T>),
    /// The slot was a tombstone and has been dropped from the list.
    Compacted,
    /// The list shrank below this index (re-entrant compaction).
    OutOfRange,
}

/// Ordered listener slots plus the id counter.
pub(crate) struct ListenerList<T> {
    next_id: u64,
    slots: Vec<Slot<T>>,
}

impl<T> ListenerList<T> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            slots: Vec::new(),
        }
    }

    /// Append a live listener and mint its id.
    pub(crate) fn insert(&mut self, listener: Listener<T>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.slots.push(Slot::Live { id, listener });
        id
    }

    /// Tombstone the slot with the given id.
    ///
    /// Returns the removed callback, or `None` when the id is unknown or
    /// already removed. Callers must drop it only after releasing the lock
    /// guarding this list, since its captures may unsubscribe on drop.
    pub(crate) fn remove_id(&mut self, target: ListenerId) -> Option<Listener<T>> {
        let index = self
            .slots
            .iter()
            .position(|slot| matches!(slot, Slot::Live { id, .. } if *id == target))?;
        self.take(index).map(|(_, listener)| listener)
    }

    /// Tombstone the first live slot holding this exact callback.
    ///
    /// Same drop rule as [`remove_id`](Self::remove_id).
    pub(crate) fn remove_listener(
        &mut self,
        target: &Listener<T>,
    ) -> Option<(ListenerId, Listener<T>)> {
        let index = self
            .slots
            .iter()
            .position(|slot| matches!(slot, Slot::Live { listener, .. } if listener.ptr_eq(target)))?;
        self.take(index)
    }

    fn take(&mut self, index: usize) -> Option<(ListenerId, Listener<T>)> {
        match mem::replace(&mut self.slots[index], Slot::Removed) {
            Slot::Live { id, listener } => Some((id, listener)),
            Slot::Removed => None,
        }
    }

    /// Number of slots, tombstones included.
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Number of live listeners.
    pub(crate) fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Live { .. }))
            .count()
    }

    pub(crate) fn visit(&mut self, index: usize) -> Visit<T> {
        match self.slots.get(index) {
            None => Visit::OutOfRange,
            Some(Slot::Live { listener, .. }) => Visit::Live(listener.clone()),
            Some(Slot::Removed) => {
                cov_mark::hit!(tombstone_compacted);
                self.slots.remove(index);
                Visit::Compacted
            }
        }
    }
}
