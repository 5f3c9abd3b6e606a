//! Repository core for Folio, an in-memory CMIS-style content repository.
//!
//! A [`Repository`] owns the object store and the type registry. Callers
//! open a [`Connection`] per principal and work with typed object facades
//! ([`Document`], [`Folder`], [`Policy`], [`Relationship`]) that read
//! through to the store on every access.
//!
//! # Rules enforced here
//!
//! - Sibling names are unique among listed children of a folder.
//! - Folders form a tree rooted at the configured root folder.
//! - A version series has at most one private working copy.
//! - Relationship endpoints, applied policies, and non-empty folders cannot
//!   be deleted.
//!
//! Every operation that touches more than one entry runs under a single
//! store write lock.

pub mod config;
pub mod connection;
pub mod create;
pub mod error;
mod filing;
mod integrity;
pub mod object;
pub mod properties;
pub mod repository;
pub mod versioning;

pub use config::RepositoryConfig;
pub use connection::Connection;
pub use create::{CreateOptions, NewObject};
pub use error::{ErrorKind, RepoError, RepoResult};
pub use object::{
    CheckinRequest, CmisObject, Document, Folder, ObjectCore, Policy, Relationship,
    RelationshipDirection,
};
pub use properties::{Properties, PropertyFilter};
pub use repository::{Repository, RepositoryInfo};
pub use versioning::{VersionLabel, VersioningState};

// Re-export key types
pub use folio_schema::{TypeRegistry, TypeTree};
pub use folio_types::{
    props, Acl, BaseType, ContentStream, ContentStreamAllowed, ObjectId, Permission,
    PropertyDefinition, PropertyType, TypeDefinition, Updatability, Value, VersionSeriesId,
};
