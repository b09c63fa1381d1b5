use super::{Bloc, BlocEvent};
use crate::Bindable;
use crate::error::BlocError;
use parking_lot::Mutex;
use std::any::{Any, type_name};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, trace};

struct BlocEntry {
    name: String,
    bloc: Arc<dyn Bloc>,
    any: Arc<dyn Any + Send + Sync>,
}

enum Initialization {
    Running(JoinHandle<Result<(), BlocError>>),
    Finished(Result<(), BlocError>),
}

/// The set of blocs an application shares with its components.
///
/// Building a context starts every bloc's [`Bloc::initialize`] concurrently,
/// each on its own thread. [`is_initializing`](BlocContext::is_initializing)
/// is true until all of them have succeeded and then flips to false exactly
/// once. If any initializer fails it stays true and the failure is reported
/// by [`wait_initialized`](BlocContext::wait_initialized).
pub struct BlocContext {
    is_initializing: Bindable<bool>,
    entries: Vec<BlocEntry>,
    initialization: Mutex<Initialization>,
}

impl BlocContext {
    /// Create a context from named, already type-erased blocs.
    ///
    /// `None` entries are skipped, so blocs that are only present in some
    /// configurations can be listed unconditionally.
    pub fn new<N>(entries: impl IntoIterator<Item = (N, Option<Arc<dyn Bloc>>)>) -> Self
    where
        N: Into<String>,
    {
        entries
            .into_iter()
            .filter_map(|(name, bloc)| Some((name, bloc?)))
            .fold(Self::builder(), |builder, (name, bloc)| {
                builder.with_dyn(name, bloc)
            })
            .build()
    }

    /// Start collecting blocs.
    pub fn builder() -> BlocContextBuilder {
        BlocContextBuilder {
            entries: Vec::new(),
        }
    }

    /// Whether initialization is still running (or has failed).
    pub fn is_initializing(&self) -> &Bindable<bool> {
        &self.is_initializing
    }

    /// Block until every initializer has finished.
    ///
    /// Returns the first failure in registration order. Later calls return
    /// the same outcome without blocking.
    pub fn wait_initialized(&self) -> Result<(), BlocError> {
        let mut state = self.initialization.lock();
        let outcome = match std::mem::replace(&mut *state, Initialization::Finished(Ok(()))) {
            Initialization::Running(handle) => handle.join().unwrap_or_else(|_| {
                Err(BlocError::InitializerPanicked {
                    name: "<coordinator>".to_string(),
                })
            }),
            Initialization::Finished(outcome) => outcome,
        };
        *state = Initialization::Finished(outcome.clone());
        outcome
    }

    /// The first registered bloc of type `B`.
    ///
    /// Asking for a type that was never registered is a programming error and
    /// is reported as [`BlocError::NotFound`].
    pub fn get_bloc<B: Bloc>(&self) -> Result<Arc<B>, BlocError> {
        self.entries
            .iter()
            .find_map(|entry| Arc::clone(&entry.any).downcast::<B>().ok())
            .ok_or(BlocError::NotFound {
                type_name: type_name::<B>(),
            })
    }

    /// Send `event` to every bloc, in registration order.
    pub fn dispatch(&self, event: &BlocEvent) {
        trace!(event = event.name(), blocs = self.entries.len(), "dispatching event");
        for entry in &self.entries {
            entry.bloc.process_event(event);
        }
    }

    /// Registration names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }
}

impl std::fmt::Debug for BlocContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlocContext")
            .field("blocs", &self.names().collect::<Vec<_>>())
            .field("is_initializing", &self.is_initializing.get())
            .finish()
    }
}

/// Collects blocs for a [`BlocContext`].
pub struct BlocContextBuilder {
    entries: Vec<BlocEntry>,
}

impl BlocContextBuilder {
    /// Register a bloc under `name`.
    pub fn with<B: Bloc>(self, name: impl Into<String>, bloc: B) -> Self {
        self.with_shared(name, Arc::new(bloc))
    }

    /// Register a bloc the caller keeps a handle to.
    pub fn with_shared<B: Bloc>(self, name: impl Into<String>, bloc: Arc<B>) -> Self {
        self.with_dyn(name, bloc)
    }

    /// Register a bloc whose concrete type has already been erased.
    pub fn with_dyn(mut self, name: impl Into<String>, bloc: Arc<dyn Bloc>) -> Self {
        let any: Arc<dyn Any + Send + Sync> = bloc.clone();
        self.entries.push(BlocEntry {
            name: name.into(),
            bloc,
            any,
        });
        self
    }

    /// Register a bloc if there is one; `None` is skipped.
    pub fn with_optional<B: Bloc>(self, name: impl Into<String>, bloc: Option<B>) -> Self {
        match bloc {
            Some(bloc) => self.with(name, bloc),
            None => self,
        }
    }

    /// Create the context and start initializing its blocs.
    pub fn build(self) -> BlocContext {
        let is_initializing = Bindable::builder(true).name("is_initializing").build();
        let blocs: Vec<(String, Arc<dyn Bloc>)> = self
            .entries
            .iter()
            .map(|entry| (entry.name.clone(), Arc::clone(&entry.bloc)))
            .collect();

        let flag = is_initializing.clone();
        let run = move || initialize_all(&blocs, &flag);
        let initialization = match thread::Builder::new()
            .name("bloc-init".into())
            .spawn(run.clone())
        {
            Ok(handle) => Initialization::Running(handle),
            Err(err) => {
                error!(%err, "could not spawn bloc initialization thread, initializing inline");
                Initialization::Finished(run())
            }
        };

        BlocContext {
            is_initializing,
            entries: self.entries,
            initialization: Mutex::new(initialization),
        }
    }
}

/// Run every initializer concurrently, then clear the flag if all succeeded.
fn initialize_all(
    blocs: &[(String, Arc<dyn Bloc>)],
    is_initializing: &Bindable<bool>,
) -> Result<(), BlocError> {
    info!(blocs = blocs.len(), "initializing blocs");

    let results: Vec<Result<(), BlocError>> = thread::scope(|scope| {
        let handles: Vec<_> = blocs
            .iter()
            .map(|(name, bloc)| (name, scope.spawn(move || bloc.initialize())))
            .collect();

        handles
            .into_iter()
            .map(|(name, handle)| match handle.join() {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(BlocError::Initialization {
                    name: name.clone(),
                    message: err.to_string(),
                }),
                Err(_) => Err(BlocError::InitializerPanicked { name: name.clone() }),
            })
            .collect()
    });

    if let Some(err) = results.into_iter().find_map(Result::err) {
        error!(%err, "bloc initialization failed");
        return Err(err);
    }

    is_initializing.set(false);
    info!("blocs initialized");
    Ok(())
}
