#![deny(missing_docs)]

//! Observable values for UI state.
//!
//! A [`Bindable<T>`] holds a value and notifies listeners synchronously when
//! it changes. Components mount a [`BindingHook`] on it instead of keeping
//! track of subscription ids by hand; blocs expose bindables as their state;
//! and [`persist::make_persistent`] keeps a bindable in sync with a store.
//!
//! # Quick Start
//!
//! ```ignore
//! use bindable::{Bindable, use_bindable};
//!
//! let name = Bindable::new("world".to_string());
//! let id = name.subscribe(|v| println!("hello {v}"));
//!
//! name.set("there".into());   // prints "hello there"
//! name.set("there".into());   // equal value: nothing happens
//! name.unsubscribe(id);
//!
//! let hook = use_bindable(&name);
//! name.set("again".into());
//! assert_eq!(hook.value().as_deref(), Some("again"));
//! assert!(hook.take_dirty());
//! ```
//!
//! # Core Types
//!
//! - [`Bindable<T>`] - Observable value. `set`, `trigger`, `subscribe`, `bind`, proxying.
//! - [`Listener<T>`] - Callback handle compared by identity, for `bind`/`unbind`.
//! - [`Shared<U>`] - Mutable value with identity equality, for in-place edits + `trigger`.
//! - [`BindingHook<T>`] - Component-side snapshot that follows a bindable.
//! - [`bloc::BlocContext`] - Event-driven logic components with an `is_initializing` flag.
//! - [`persist::PersistentStore`] - Where [`persist::make_persistent`] reads and writes values.
//!
//! # Notification order
//!
//! ```ignore
//! let b = Bindable::new(0);
//! b.subscribe(|_| println!("first"));
//! b.subscribe(|_| println!("second"));
//! b.trigger(); // prints "second" then "first"
//! ```
//!
//! # Proxying
//!
//! ```ignore
//! let source = Bindable::new(0);
//! let mirror = Bindable::new(1);
//! mirror.start_proxy(&source); // mirror == 0
//! source.set(10);              // mirror == 10
//! mirror.stop_proxy();
//! source.set(11);              // mirror stays 10
//! ```

mod bindable;
pub mod bloc;
mod error;
mod hash;
mod hook;
mod listener;
pub mod persist;
mod shared;

// Core types
pub use bindable::{Bindable, BindableBuilder};
pub use listener::{Listener, ListenerId};
pub use shared::Shared;

// Component integration
pub use hook::{BindingHook, use_bindable, use_bindable_optional};

// Errors
pub use error::{BlocError, PersistError};

#[cfg(test)]
mod tests;
