//! In-memory object storage for the Folio content repository.
//!
//! The store maps object ids to mutable [`Entry`] records and maintains the
//! auxiliary indexes every repository operation needs:
//!
//! - [`FilingIndex`]: parent/child sets in both directions plus the unfiled set
//! - [`EdgeIndex`]: relationship ids keyed by source and by target endpoint
//! - [`PolicyIndex`]: objects each policy is applied to
//! - [`VersionSeries`]: member versions and the checked-out id of each series
//!
//! # Design Rules
//!
//! 1. All state lives in one [`StoreState`] behind a single `RwLock`.
//! 2. Multi-entry operations run inside one [`InMemoryObjectStore::write`]
//!    closure, so no reader observes a half-applied change.
//! 3. The store maintains indexes but does not enforce repository rules;
//!    referential integrity and versioning live in `folio-repo`.
//! 4. Lock poisoning is reported as [`StoreError::LockPoisoned`], never a panic.

pub mod entry;
pub mod error;
pub mod index;
pub mod memory;
pub mod series;

pub use entry::Entry;
pub use error::{StoreError, StoreResult};
pub use index::{EdgeIndex, FilingIndex, PolicyIndex};
pub use memory::{InMemoryObjectStore, StoreLimits, StoreState, StoreStats};
pub use series::VersionSeries;
