use crate::listener::{Listener, ListenerId, ListenerList, Visit};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Observable value container.
///
/// A `Bindable` owns a value and a list of listeners. Every accepted change
/// runs a notification pass that synchronously invokes each live listener,
/// most recently subscribed first, with the new and the previous value.
///
/// The handle is cheap to clone; clones share the same value and listeners.
/// Two handles compare equal when they refer to the same bindable.
///
/// # Usage
/// ```ignore
/// let count = Bindable::new(0);
/// let id = count.subscribe(|v| println!("count = {v}"));
///
/// count.set(1);          // prints "count = 1"
/// count.set(1);          // equal value: no-op
/// count.set_with(2, false); // stored silently
/// count.trigger();       // prints "count = 2"
///
/// count.unsubscribe(id);
/// ```
///
/// # Change detection
/// With `trigger_when_different` enabled (the default) a `set` whose value
/// equals the current one under `PartialEq` is skipped entirely: the stored
/// value is not overwritten and nobody is notified. Values with reference
/// semantics should use [`Shared`](crate::Shared), whose equality is identity,
/// and announce in-place edits with [`trigger`](Bindable::trigger).
///
/// # Re-entrancy
/// No lock is held while a listener runs. Listeners may read, set, trigger,
/// subscribe or unsubscribe on any bindable, including the one notifying them.
/// A panicking listener unwinds straight out of `set`/`trigger`; listeners
/// later in the pass are not notified.
pub struct Bindable<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    name: Option<Arc<str>>,
    value: Mutex<T>,
    trigger_when_different: AtomicBool,
    listeners: Mutex<ListenerList<T>>,
    proxy: Mutex<Option<ProxyLink<T>>>,
}

/// Subscription this bindable holds on its proxy source.
struct ProxyLink<T> {
    source: Weak<Inner<T>>,
    subscription: ListenerId,
}

impl<T> Inner<T> {
    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    fn unsubscribe(&self, id: ListenerId) {
        // The guard is released at the end of this statement, before the
        // removed callback and its captures are dropped
        let removed = self.listeners.lock().remove_id(id);
        if removed.is_some() {
            trace!(bindable = self.label(), listener = %id, "unsubscribed");
        }
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        // A dropped downstream stops mirroring; the source may outlive it
        if let Some(link) = self.proxy.get_mut().take() {
            if let Some(source) = link.source.upgrade() {
                source.unsubscribe(link.subscription);
            }
        }
    }
}

impl<T> Bindable<T> {
    /// Name given at construction, used in log output.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Remove the listener registered under `id`.
    ///
    /// Unknown or already removed ids are ignored.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.inner.unsubscribe(id);
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().live_count()
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Bindable<T> {
    /// Create a bindable that only notifies when the value actually changes.
    pub fn new(value: T) -> Self {
        Self::with_policy(value, true)
    }

    /// Create a bindable with an explicit change-detection policy.
    ///
    /// When `trigger_when_different` is false every `set` stores the value and
    /// notifies, even if it equals the current one.
    pub fn with_policy(value: T, trigger_when_different: bool) -> Self {
        Self::builder(value)
            .trigger_when_different(trigger_when_different)
            .build()
    }

    /// Start configuring a bindable.
    pub fn builder(value: T) -> BindableBuilder<T> {
        BindableBuilder {
            value,
            trigger_when_different: true,
            name: None,
        }
    }

    /// Clone of the current value.
    pub fn get(&self) -> T {
        self.inner.value.lock().clone()
    }

    /// Borrow the current value without cloning it.
    ///
    /// The value lock is held for the duration of `f`; do not touch this
    /// bindable from inside the closure.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.lock())
    }

    /// Store a value and notify listeners.
    ///
    /// Equivalent to `set_with(value, true)`.
    pub fn set(&self, value: T) {
        self.set_with(value, true);
    }

    /// Store a value, optionally notifying listeners.
    ///
    /// If `trigger_when_different` is enabled and `value` equals the current
    /// value, the call does nothing at all. Otherwise the value is replaced
    /// and, when `fire_listeners` is true, a notification pass runs with the
    /// replaced value as `previous`.
    pub fn set_with(&self, value: T, fire_listeners: bool) {
        let previous = {
            let mut current = self.inner.value.lock();
            if self.trigger_when_different() && *current == value {
                cov_mark::hit!(set_skipped_equal_value);
                return;
            }
            std::mem::replace(&mut *current, value)
        };

        if fire_listeners {
            self.notify(&previous);
        }
    }

    /// Whether `set` skips values equal to the current one.
    pub fn trigger_when_different(&self) -> bool {
        self.inner.trigger_when_different.load(Ordering::Acquire)
    }

    /// Change the policy used by subsequent `set` calls.
    pub fn set_trigger_when_different(&self, enabled: bool) {
        self.inner
            .trigger_when_different
            .store(enabled, Ordering::Release);
    }

    /// Run a notification pass with the current value.
    ///
    /// This is how in-place mutation of a shared value is announced, since
    /// such mutation never goes through `set`. Listeners receive the current
    /// value as both `value` and `previous`.
    pub fn trigger(&self) {
        let current = self.get();
        self.notify(&current);
    }

    /// Invoke every live listener, last subscribed first.
    ///
    /// Tombstones met along the way are dropped from the list. The value is
    /// re-read for each listener so that a nested `set` performed by an
    /// earlier listener is visible to the later ones.
    fn notify(&self, previous: &T) {
        let mut index = self.inner.listeners.lock().len();
        trace!(bindable = self.inner.label(), slots = index, "notifying listeners");

        while index > 0 {
            index -= 1;
            let listener = match self.inner.listeners.lock().visit(index) {
                Visit::Live(listener) => listener,
                Visit::Compacted | Visit::OutOfRange => continue,
            };
            let value = self.get();
            listener.call(&value, previous);
        }
    }

    /// Register a callback for value changes.
    ///
    /// The callback is not invoked now. Keep the returned id to
    /// [`unsubscribe`](Bindable::unsubscribe) later.
    pub fn subscribe<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.insert(Listener::from_fn(f))
    }

    /// Register a callback that receives both the new and the previous value.
    pub fn subscribe_with_previous<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        self.insert(Listener::new(f))
    }

    /// Register a callback and invoke it once with the current value.
    ///
    /// Only this callback fires; other listeners are not notified.
    pub fn subscribe_and_trigger<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let listener = Listener::from_fn(f);
        let id = self.insert(listener.clone());
        let current = self.get();
        listener.call(&current, &current);
        id
    }

    /// Register a listener by handle, optionally firing it immediately.
    ///
    /// The same handle can later be passed to [`unbind`](Bindable::unbind).
    pub fn bind(&self, listener: &Listener<T>, fire_immediately: bool) -> ListenerId {
        let id = self.insert(listener.clone());
        if fire_immediately {
            let current = self.get();
            listener.call(&current, &current);
        }
        id
    }

    /// Remove the first live registration of `listener`.
    ///
    /// Does nothing when the handle is not bound.
    pub fn unbind(&self, listener: &Listener<T>) {
        let removed = self.inner.listeners.lock().remove_listener(listener);
        if let Some((id, _listener)) = removed {
            trace!(bindable = self.inner.label(), listener = %id, "unbound");
        }
    }

    fn insert(&self, listener: Listener<T>) -> ListenerId {
        let id = self.inner.listeners.lock().insert(listener);
        trace!(bindable = self.inner.label(), listener = %id, "subscribed");
        id
    }

    /// Continuously mirror the value of `source`.
    ///
    /// Any proxy already active is stopped first. This bindable is synced to
    /// the source's current value right away and then on every source
    /// notification. Incoming values go through this bindable's own `set`, so
    /// its change-detection policy and listeners apply as usual.
    ///
    /// The source is referenced weakly and the source only holds a weak
    /// reference back, so neither keeps the other alive.
    pub fn start_proxy(&self, source: &Bindable<T>) {
        self.stop_proxy();

        let downstream = Arc::downgrade(&self.inner);
        let mirror = Listener::from_fn(move |value: &T| {
            if let Some(inner) = downstream.upgrade() {
                Bindable { inner }.set(value.clone());
            }
        });

        let subscription = source.bind(&mirror, false);
        *self.inner.proxy.lock() = Some(ProxyLink {
            source: Arc::downgrade(&source.inner),
            subscription,
        });
        debug!(
            bindable = self.inner.label(),
            source = source.inner.label(),
            "proxy started"
        );

        let current = source.get();
        mirror.call(&current, &current);
    }

    /// Stop mirroring the current proxy source.
    ///
    /// Does nothing when no proxy is active.
    pub fn stop_proxy(&self) {
        let link = self.inner.proxy.lock().take();
        let Some(link) = link else {
            return;
        };
        if let Some(source) = link.source.upgrade() {
            source.unsubscribe(link.subscription);
        }
        debug!(bindable = self.inner.label(), "proxy stopped");
    }

    /// The bindable currently being mirrored, if any and still alive.
    pub fn proxy_source(&self) -> Option<Bindable<T>> {
        let proxy = self.inner.proxy.lock();
        let inner = proxy.as_ref()?.source.upgrade()?;
        Some(Bindable { inner })
    }
}

impl<T> Clone for Bindable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Bindable<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for Bindable<T> {}

impl<T: Clone + PartialEq + Send + Sync + Default + 'static> Default for Bindable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Bindable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindable")
            .field("name", &self.inner.name)
            .field("value", &*self.inner.value.lock())
            .field(
                "trigger_when_different",
                &self.inner.trigger_when_different.load(Ordering::Relaxed),
            )
            .field("listeners", &self.inner.listeners.lock().live_count())
            .finish()
    }
}

/// Builder for [`Bindable`].
///
/// ```ignore
/// let selected = Bindable::builder(None::<u32>)
///     .name("selected-row")
///     .trigger_when_different(false)
///     .build();
/// ```
pub struct BindableBuilder<T> {
    value: T,
    trigger_when_different: bool,
    name: Option<Arc<str>>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> BindableBuilder<T> {
    /// Skip `set` calls whose value equals the current one (default: true).
    pub fn trigger_when_different(mut self, enabled: bool) -> Self {
        self.trigger_when_different = enabled;
        self
    }

    /// Name shown in log output.
    pub fn name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Create the bindable.
    pub fn build(self) -> Bindable<T> {
        Bindable {
            inner: Arc::new(Inner {
                name: self.name,
                value: Mutex::new(self.value),
                trigger_when_different: AtomicBool::new(self.trigger_when_different),
                listeners: Mutex::new(ListenerList::new()),
                proxy: Mutex::new(None),
            }),
        }
    }
}
