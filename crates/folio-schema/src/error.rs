//! Error types for schema operations.

use thiserror::Error;

/// Errors that can occur while registering or resolving types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// The definition is malformed or conflicts with the registry.
    #[error("invalid type definition {type_id}: {reason}")]
    InvalidArgument { type_id: String, reason: String },

    /// No type with this id is registered.
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// The registry lock was poisoned.
    #[error("type registry lock poisoned")]
    LockPoisoned,
}

impl SchemaError {
    pub(crate) fn invalid(type_id: &str, reason: impl Into<String>) -> Self {
        SchemaError::InvalidArgument {
            type_id: type_id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for schema operations.
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;
