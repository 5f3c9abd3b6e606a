use folio_types::{ObjectId, VersionSeriesId};

/// Errors from object store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// The requested version series was not found.
    #[error("version series not found: {0}")]
    SeriesNotFound(VersionSeriesId),

    /// An entry with this id is already stored.
    #[error("object already exists: {0}")]
    DuplicateId(ObjectId),

    /// A configured memory quota would be exceeded.
    #[error("{resource} quota exceeded: limit {limit}, requested {requested}")]
    QuotaExceeded {
        resource: &'static str,
        limit: u64,
        requested: u64,
    },

    /// The store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
