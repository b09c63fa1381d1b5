use thiserror::Error;

/// Failures reported by [`PersistentStore`](crate::persist::PersistentStore)
/// implementations and [`make_persistent`](crate::persist::make_persistent).
#[derive(Error, Debug)]
pub enum PersistError {
    /// The backing store rejected the operation.
    #[error("store error for key '{key}': {message}")]
    Store {
        /// Key being read or written.
        key: String,
        /// Store-specific description.
        message: String,
    },

    /// The value could not be encoded for storage.
    #[error("failed to serialize value for key '{key}'")]
    Serialize {
        /// Key being written.
        key: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The stored text could not be decoded into the bindable's type.
    #[error("failed to deserialize stored value for key '{key}'")]
    Deserialize {
        /// Key being read.
        key: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem access failed.
    #[error("io error at '{path}'")]
    Io {
        /// File or directory involved.
        path: String,
        /// Underlying io error.
        #[source]
        source: std::io::Error,
    },
}

/// Failures reported by the BLoC container.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlocError {
    /// No registered bloc has the requested type.
    #[error("No BLoC instance found for specified type: {type_name}")]
    NotFound {
        /// `std::any::type_name` of the requested bloc.
        type_name: &'static str,
    },

    /// A bloc's `initialize` returned an error.
    #[error("BLoC '{name}' failed to initialize: {message}")]
    Initialization {
        /// Registration name of the bloc.
        name: String,
        /// Description supplied by the bloc.
        message: String,
    },

    /// A bloc's `initialize` panicked.
    #[error("BLoC '{name}' panicked during initialization")]
    InitializerPanicked {
        /// Registration name of the bloc.
        name: String,
    },
}
