use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0:?}")]
    InvalidId(String),

    #[error("unknown permission: {0}")]
    UnknownPermission(String),

    #[error("unknown base type: {0}")]
    UnknownBaseType(String),

    #[error("property {property} expects {expected} values, got {actual}")]
    TypeMismatch {
        property: String,
        expected: String,
        actual: String,
    },

    #[error("property {property} is single-valued but {count} values were supplied")]
    Cardinality { property: String, count: usize },

    #[error("property {property} is required")]
    RequiredValueMissing { property: String },
}
