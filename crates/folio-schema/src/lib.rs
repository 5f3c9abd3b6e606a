//! Type management for the Folio content repository.
//!
//! Object types form four trees rooted at the base types (document, folder,
//! policy, relationship). Custom types extend a parent, inherit its declared
//! properties, and may not redeclare a reserved catalog property.
//!
//! # Modules
//!
//! - [`error`]: Error types for schema operations
//! - [`traits`]: The [`TypeRegistry`] trait defining the registry interface
//! - [`names`]: Type and property id validation
//! - [`manager`]: In-memory [`InMemoryTypeManager`]

pub mod error;
pub mod manager;
pub mod names;
pub mod traits;

pub use error::{SchemaError, SchemaResult};
pub use manager::InMemoryTypeManager;
pub use names::{validate_property_id, validate_type_id};
pub use traits::{TypeRegistry, TypeTree};
