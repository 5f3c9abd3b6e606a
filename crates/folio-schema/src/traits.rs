//! The [`TypeRegistry`] trait defining the type-management interface.

use std::collections::BTreeMap;

use serde::Serialize;

use folio_types::{PropertyDefinition, TypeDefinition};

use crate::error::{SchemaError, SchemaResult};

/// A type together with its subtypes, as returned by
/// [`TypeRegistry::type_descendants`].
#[derive(Clone, Debug, Serialize)]
pub struct TypeTree {
    pub definition: TypeDefinition,
    pub children: Vec<TypeTree>,
}

/// Registry of object types.
///
/// Implementations must be thread-safe and must never hand out a reference
/// into their own storage: every returned definition is an owned copy.
pub trait TypeRegistry: Send + Sync {
    /// Validate and register a custom type.
    fn add_type(&self, definition: TypeDefinition) -> SchemaResult<()>;

    /// Look up a type. With `include_properties` the copy carries the
    /// effective property set; without it, no property definitions.
    fn type_definition(&self, id: &str, include_properties: bool) -> SchemaResult<TypeDefinition>;

    /// Remove a type, returning its definition.
    fn remove_type(&self, id: &str) -> SchemaResult<TypeDefinition>;

    /// Direct subtypes of `id`, or the base types when `id` is `None`.
    fn type_children(
        &self,
        id: Option<&str>,
        include_properties: bool,
    ) -> SchemaResult<Vec<TypeDefinition>>;

    /// Catalog, inherited, and declared properties of a type.
    fn effective_properties(&self, id: &str) -> SchemaResult<BTreeMap<String, PropertyDefinition>>;

    /// Whether a type with this id is registered.
    fn has_type(&self, id: &str) -> bool {
        self.type_definition(id, false).is_ok()
    }

    /// One effective property definition, if the type has it.
    fn property_definition(
        &self,
        type_id: &str,
        property_id: &str,
    ) -> SchemaResult<Option<PropertyDefinition>> {
        Ok(self.effective_properties(type_id)?.remove(property_id))
    }

    /// Whether `type_id` equals `ancestor_id` or derives from it.
    fn is_subtype_of(&self, type_id: &str, ancestor_id: &str) -> SchemaResult<bool> {
        let mut current = Some(type_id.to_string());
        while let Some(id) = current {
            if id == ancestor_id {
                return Ok(true);
            }
            current = self.type_definition(&id, false)?.parent_type_id;
        }
        Ok(false)
    }

    /// Subtype trees below `id` (or below the base types), `depth` levels
    /// deep. `None` means unlimited; `Some(0)` is rejected.
    fn type_descendants(
        &self,
        id: Option<&str>,
        depth: Option<usize>,
        include_properties: bool,
    ) -> SchemaResult<Vec<TypeTree>> {
        if depth == Some(0) {
            return Err(SchemaError::InvalidArgument {
                type_id: id.unwrap_or_default().to_string(),
                reason: "depth must be at least 1".into(),
            });
        }
        let mut out = Vec::new();
        for child in self.type_children(id, include_properties)? {
            let children = match depth {
                Some(1) => Vec::new(),
                _ => self.type_descendants(
                    Some(&child.id),
                    depth.map(|d| d - 1),
                    include_properties,
                )?,
            };
            out.push(TypeTree {
                definition: child,
                children,
            });
        }
        Ok(out)
    }
}
