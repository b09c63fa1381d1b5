//! BLoC-style event/state containers.
//!
//! A bloc owns application state, usually as [`Bindable`](crate::Bindable)
//! fields that components mount hooks on, and mutates it in response to
//! [`BlocEvent`]s. A [`BlocContext`] groups the blocs of an application, runs
//! their initialization and fans events out to all of them.
//!
//! ```ignore
//! struct CounterBloc {
//!     count: Bindable<i64>,
//!     hooks: EventHooks,
//! }
//!
//! impl CounterBloc {
//!     fn new() -> Self {
//!         let count = Bindable::new(0);
//!         let mut hooks = EventHooks::new();
//!         let target = count.clone();
//!         hooks.hook_event("increment", move |_| target.set(target.get() + 1));
//!         Self { count, hooks }
//!     }
//! }
//!
//! impl Bloc for CounterBloc {
//!     fn process_event(&self, event: &BlocEvent) {
//!         self.hooks.process_event(event);
//!     }
//! }
//!
//! let context = BlocContext::builder().with("counter", CounterBloc::new()).build();
//! context.dispatch(&BlocEvent::named("increment"));
//! ```

mod context;
mod event;

pub use context::{BlocContext, BlocContextBuilder};
pub use event::BlocEvent;

use crate::hash::FastHashBuilder;
use indexmap::IndexMap;
use std::any::Any;
use std::error::Error;
use tracing::trace;

/// Error type blocs return from [`Bloc::initialize`].
pub type InitError = Box<dyn Error + Send + Sync>;

/// An application logic component driven by events.
pub trait Bloc: Any + Send + Sync {
    /// Prepare the bloc; called once, on its own thread, by [`BlocContext`].
    fn initialize(&self) -> Result<(), InitError> {
        Ok(())
    }

    /// React to an event dispatched through the context.
    fn process_event(&self, event: &BlocEvent);
}

type EventHandler = Box<dyn Fn(&BlocEvent) + Send + Sync>;

/// Event name to handler table for implementing [`Bloc::process_event`].
#[derive(Default)]
pub struct EventHooks {
    handlers: IndexMap<String, Vec<EventHandler>, FastHashBuilder>,
}

impl EventHooks {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `handler` for every event called `name`.
    ///
    /// Several handlers may share a name; they run in registration order.
    pub fn hook_event<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&BlocEvent) + Send + Sync + 'static,
    {
        self.handlers
            .entry(name.into())
            .or_default()
            .push(Box::new(handler));
    }

    /// Invoke the handlers registered for `event`; unknown names are ignored.
    pub fn process_event(&self, event: &BlocEvent) {
        let Some(handlers) = self.handlers.get(event.name()) else {
            trace!(event = event.name(), "no handler for event");
            return;
        };
        for handler in handlers {
            handler(event);
        }
    }

    /// Names that have at least one handler, in registration order.
    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHooks")
            .field("events", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
