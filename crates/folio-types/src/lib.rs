//! Foundation types for the Folio content repository.
//!
//! This crate provides the identity, value, and schema types shared by every
//! other Folio crate. It has no notion of storage or locking; those live in
//! `folio-store` and `folio-repo`.
//!
//! # Key Types
//!
//! - [`ObjectId`] / [`VersionSeriesId`]: opaque string identifiers (UUID v7 when generated)
//! - [`Value`]: typed, multi-valued property container
//! - [`PropertyDefinition`]: declared type, cardinality, and updatability of a property
//! - [`TypeDefinition`]: object type with base type, flags, and declared properties
//! - [`Acl`] / [`Permission`]: principal-to-permission map with merge algebra
//! - [`PropertyCatalog`]: the standard property definitions of the four base types
//! - [`ContentStream`]: opaque content bytes with media-type metadata

pub mod acl;
pub mod catalog;
pub mod content;
pub mod error;
pub mod id;
pub mod property;
pub mod typedef;
pub mod value;

pub use acl::{Acl, Permission};
pub use catalog::{props, PropertyCatalog};
pub use content::ContentStream;
pub use error::TypeError;
pub use id::{ObjectId, VersionSeriesId};
pub use property::{Cardinality, PropertyDefinition, Updatability};
pub use typedef::{BaseType, ContentStreamAllowed, TypeDefinition};
pub use value::{PropertyType, Value};
