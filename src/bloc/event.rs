use std::any::Any;
use std::fmt;

/// A named event a bloc can react to.
///
/// The payload is type-erased; handlers recover it with [`data`](BlocEvent::data).
pub struct BlocEvent {
    name: String,
    data: Box<dyn Any + Send + Sync>,
}

impl BlocEvent {
    /// Create an event carrying `data`.
    pub fn new<D: Any + Send + Sync>(name: impl Into<String>, data: D) -> Self {
        Self {
            name: name.into(),
            data: Box::new(data),
        }
    }

    /// Create an event with no payload.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, ())
    }

    /// Event name used to look up handlers.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload, if it is of type `D`.
    pub fn data<D: Any>(&self) -> Option<&D> {
        self.data.downcast_ref::<D>()
    }
}

impl fmt::Debug for BlocEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlocEvent")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
