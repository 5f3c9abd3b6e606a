use std::fmt;

use folio_schema::SchemaError;
use folio_store::StoreError;
use folio_types::TypeError;
use thiserror::Error;

/// Errors surfaced to repository callers.
///
/// Every variant is recoverable; nothing is retried automatically.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepoError {
    /// Malformed caller input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A business rule forbids the operation.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A name is empty or collides with a sibling.
    #[error("name constraint violation: {0}")]
    NameConstraintViolation(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// Checkout/checkin state machine violation.
    #[error("versioning error: {0}")]
    Versioning(String),

    /// The caller's change token is stale.
    #[error("update conflict: {0}")]
    UpdateConflict(String),

    /// Storage-layer failure such as an exhausted memory quota.
    #[error("storage error: {0}")]
    Storage(String),

    /// Misuse of an object facade, e.g. using a policy that was never saved.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Payload-free classification of a [`RepoError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    Constraint,
    NameConstraintViolation,
    ObjectNotFound,
    TypeNotFound,
    Versioning,
    UpdateConflict,
    Storage,
    Runtime,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepoError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            RepoError::Constraint(_) => ErrorKind::Constraint,
            RepoError::NameConstraintViolation(_) => ErrorKind::NameConstraintViolation,
            RepoError::ObjectNotFound(_) => ErrorKind::ObjectNotFound,
            RepoError::TypeNotFound(_) => ErrorKind::TypeNotFound,
            RepoError::Versioning(_) => ErrorKind::Versioning,
            RepoError::UpdateConflict(_) => ErrorKind::UpdateConflict,
            RepoError::Storage(_) => ErrorKind::Storage,
            RepoError::Runtime(_) => ErrorKind::Runtime,
        }
    }

    pub(crate) fn constraint(msg: impl Into<String>) -> Self {
        RepoError::Constraint(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        RepoError::InvalidArgument(msg.into())
    }
}

impl From<StoreError> for RepoError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => RepoError::ObjectNotFound(id.to_string()),
            StoreError::SeriesNotFound(id) => {
                RepoError::ObjectNotFound(format!("version series {id}"))
            }
            StoreError::DuplicateId(id) => {
                RepoError::InvalidArgument(format!("object id {id} is already in use"))
            }
            e @ StoreError::QuotaExceeded { .. } => RepoError::Storage(e.to_string()),
            e @ StoreError::LockPoisoned => RepoError::Storage(e.to_string()),
        }
    }
}

impl From<SchemaError> for RepoError {
    fn from(e: SchemaError) -> Self {
        match e {
            e @ SchemaError::InvalidArgument { .. } => RepoError::InvalidArgument(e.to_string()),
            SchemaError::TypeNotFound(id) => RepoError::TypeNotFound(id),
            e @ SchemaError::LockPoisoned => RepoError::Storage(e.to_string()),
        }
    }
}

impl From<TypeError> for RepoError {
    fn from(e: TypeError) -> Self {
        match e {
            TypeError::InvalidId(_)
            | TypeError::UnknownPermission(_)
            | TypeError::UnknownBaseType(_) => RepoError::InvalidArgument(e.to_string()),
            TypeError::TypeMismatch { .. }
            | TypeError::Cardinality { .. }
            | TypeError::RequiredValueMissing { .. } => RepoError::Constraint(e.to_string()),
        }
    }
}

/// Result alias for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;
