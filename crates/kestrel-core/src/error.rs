//! Error types for the Kestrel fleet core.

use thiserror::Error;

/// Main error type for Kestrel operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KestrelError {
    /// A referenced object does not exist in the plant model.
    #[error("Object not found: {kind} with name {name}")]
    NotFound { kind: &'static str, name: String },

    /// An object with the same name already exists.
    #[error("Object already exists: {kind} with name {name}")]
    AlreadyExists { kind: &'static str, name: String },

    /// A transport order could not be created as requested.
    #[error("Invalid transport order {name}: {message}")]
    InvalidOrder { name: String, message: String },

    /// An object is not in a state that permits the requested operation.
    #[error("Illegal state for {name}: {message}")]
    IllegalState { name: String, message: String },

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error (should not happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl KestrelError {
    /// Shorthand for a [`KestrelError::NotFound`].
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        KestrelError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Returns true if this error only reports a missing object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, KestrelError::NotFound { .. })
    }
}

/// Convenience Result type for Kestrel operations.
pub type Result<T> = std::result::Result<T, KestrelError>;

impl From<serde_json::Error> for KestrelError {
    fn from(err: serde_json::Error) -> Self {
        KestrelError::SerializationError(err.to_string())
    }
}
