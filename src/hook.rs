//! Component-side adapter for bindables.
//!
//! A UI component that renders a bindable's value needs three things: a
//! snapshot it can read during rendering, a way to learn that the snapshot
//! changed so it can schedule a redraw, and clean subscription teardown when
//! it goes away or switches to another bindable. [`BindingHook`] provides
//! exactly that and nothing more; scheduling the redraw is left to the UI
//! loop, which polls [`BindingHook::take_dirty`].
//!
//! ```ignore
//! struct Label {
//!     text: BindingHook<String>,
//! }
//!
//! impl Label {
//!     fn new(source: &Bindable<String>) -> Self {
//!         Self { text: use_bindable(source) }
//!     }
//!
//!     fn update(&mut self, source: Option<&Bindable<String>>) {
//!         self.text.mount(source); // resubscribes only if the source changed
//!     }
//!
//!     fn render(&self) -> String {
//!         self.text.value().unwrap_or_else(|| "undefined".into())
//!     }
//! }
//! ```

use crate::{Bindable, ListenerId};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

type OnChange<T> = Arc<dyn Fn(Option<&T>) + Send + Sync>;

/// Snapshot shared between the hook and its listener.
struct HookState<T> {
    snapshot: Mutex<Option<T>>,
    dirty: AtomicBool,
    on_change: Option<OnChange<T>>,
}

impl<T> HookState<T> {
    fn publish(&self, value: Option<&T>)
    where
        T: Clone,
    {
        *self.snapshot.lock() = value.cloned();
        self.dirty.store(true, Ordering::Release);
        if let Some(on_change) = &self.on_change {
            on_change(value);
        }
    }
}

enum Mount<T> {
    Unmounted,
    Absent,
    Bound {
        bindable: Bindable<T>,
        subscription: ListenerId,
    },
}

/// Keeps a component's copy of a bindable's value up to date.
///
/// `None` from [`value`](BindingHook::value) is the absent sentinel: either
/// nothing is mounted or the component was given no bindable.
pub struct BindingHook<T> {
    state: Arc<HookState<T>>,
    mount: Mount<T>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> BindingHook<T> {
    /// Create an unmounted hook.
    pub fn new() -> Self {
        Self::with_state(None)
    }

    /// Create an unmounted hook that also calls `on_change` whenever the
    /// snapshot is refreshed.
    pub fn with_on_change<F>(on_change: F) -> Self
    where
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        Self::with_state(Some(Arc::new(on_change)))
    }

    fn with_state(on_change: Option<OnChange<T>>) -> Self {
        Self {
            state: Arc::new(HookState {
                snapshot: Mutex::new(None),
                dirty: AtomicBool::new(false),
                on_change,
            }),
            mount: Mount::Unmounted,
        }
    }

    /// Attach to `bindable`, or to nothing.
    ///
    /// Mounting the bindable that is already mounted does nothing. Otherwise
    /// the previous subscription is dropped, a new one is made, and the
    /// snapshot is re-read right after subscribing so a change made between
    /// the last render and this call is not lost. Mounting `None` publishes
    /// the absent sentinel.
    pub fn mount(&mut self, bindable: Option<&Bindable<T>>) {
        match (&self.mount, bindable) {
            (Mount::Bound { bindable: current, .. }, Some(next)) if current == next => return,
            (Mount::Absent, None) => return,
            _ => {}
        }
        self.unmount();

        let Some(bindable) = bindable else {
            self.mount = Mount::Absent;
            self.state.publish(None);
            debug!("hook mounted without a bindable");
            return;
        };

        let state = Arc::clone(&self.state);
        let subscription = bindable.subscribe(move |value| state.publish(Some(value)));
        self.mount = Mount::Bound {
            bindable: bindable.clone(),
            subscription,
        };
        debug!(bindable = bindable.name(), listener = %subscription, "hook mounted");

        let current = bindable.get();
        self.state.publish(Some(&current));
    }

    /// Detach from the mounted bindable; does nothing when unmounted.
    pub fn unmount(&mut self) {
        if let Mount::Bound {
            bindable,
            subscription,
        } = std::mem::replace(&mut self.mount, Mount::Unmounted)
        {
            bindable.unsubscribe(subscription);
            debug!(bindable = bindable.name(), listener = %subscription, "hook unmounted");
        }
    }

    /// Whether a bindable is currently mounted.
    pub fn is_mounted(&self) -> bool {
        matches!(self.mount, Mount::Bound { .. })
    }

    /// Latest snapshot, `None` when absent.
    pub fn value(&self) -> Option<T> {
        self.state.snapshot.lock().clone()
    }

    /// Return and clear the "needs re-render" flag.
    pub fn take_dirty(&self) -> bool {
        self.state.dirty.swap(false, Ordering::AcqRel)
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Default for BindingHook<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for BindingHook<T> {
    fn drop(&mut self) {
        if let Mount::Bound {
            bindable,
            subscription,
        } = &self.mount
        {
            bindable.unsubscribe(*subscription);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for BindingHook<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingHook")
            .field("snapshot", &*self.state.snapshot.lock())
            .field("dirty", &self.state.dirty.load(Ordering::Relaxed))
            .field("mounted", &matches!(self.mount, Mount::Bound { .. }))
            .finish()
    }
}

/// Mount a hook on a bindable that is known to exist.
pub fn use_bindable<T>(bindable: &Bindable<T>) -> BindingHook<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let mut hook = BindingHook::new();
    hook.mount(Some(bindable));
    hook
}

/// Mount a hook on a bindable that may be absent.
pub fn use_bindable_optional<T>(bindable: Option<&Bindable<T>>) -> BindingHook<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let mut hook = BindingHook::new();
    hook.mount(bindable);
    hook
}
