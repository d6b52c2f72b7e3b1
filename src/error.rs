//! Error types for registry, factory, dispatch and driver operations.

use std::fmt;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All failures surfaced by the cache layer.
///
/// Nothing here is retried automatically: every variant reaches the caller
/// as soon as it happens.
#[derive(Debug)]
pub enum Error {
    /// A required option is missing or an option has the wrong type.
    ConfigError { key: String, reason: String },

    /// No driver constructor is registered under this name.
    DriverNotFound(String),

    /// The driver was constructed but its initialization hook failed.
    InitializationError { driver: String, source: Box<Error> },

    /// No instance is registered under this namespace.
    InstanceNotFound(String),

    /// No instance has been constructed yet, so there is no default.
    NoInstance,

    /// The resolved instance does not expose the operation, or the
    /// arguments do not fit it.
    DispatchError(String),

    /// The backing store failed (I/O, network, protocol).
    BackendError(String),

    /// A value could not be encoded for, or decoded from, the store.
    SerializationError(String),

    /// The instance is not in a state that accepts the call.
    InvalidState(String),

    /// The hashing helper does not know this algorithm.
    UnsupportedAlgorithm(String),
}

impl Error {
    /// Shorthand for a configuration error on `key`.
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ConfigError {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a failure raised while initializing `driver`.
    pub fn initialization(driver: impl Into<String>, source: Error) -> Self {
        Error::InitializationError {
            driver: driver.into(),
            source: Box::new(source),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConfigError { key, reason } => {
                write!(f, "Configuration error for option '{}': {}", key, reason)
            }
            Error::DriverNotFound(name) => write!(f, "Cache driver '{}' does not exist", name),
            Error::InitializationError { driver, source } => {
                write!(f, "Failed to initialize '{}' driver: {}", driver, source)
            }
            Error::InstanceNotFound(ns) => {
                write!(f, "No cache instance registered under namespace '{}'", ns)
            }
            Error::NoInstance => write!(f, "No cache instance has been created yet"),
            Error::DispatchError(msg) => write!(f, "Dispatch error: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::UnsupportedAlgorithm(name) => {
                write!(f, "Unsupported hash algorithm '{}'", name)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InitializationError { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::BackendError(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::BackendError(format!("Redis error: {}", e))
    }
}
