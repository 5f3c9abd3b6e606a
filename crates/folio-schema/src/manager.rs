//! In-memory type registry.
//!
//! [`InMemoryTypeManager`] keeps type definitions and their declared
//! property definitions in two separate maps behind one `RwLock`. Stored
//! definitions never carry properties; they are re-attached on every read
//! so a caller cannot corrupt the canonical copy.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use folio_types::{BaseType, PropertyCatalog, PropertyDefinition, TypeDefinition};

use crate::error::{SchemaError, SchemaResult};
use crate::names::{validate_property_id, validate_type_id};
use crate::traits::TypeRegistry;

#[derive(Debug, Default)]
struct TypeTable {
    types: HashMap<String, TypeDefinition>,
    properties: HashMap<String, BTreeMap<String, PropertyDefinition>>,
}

impl TypeTable {
    fn get(&self, id: &str) -> SchemaResult<&TypeDefinition> {
        self.types
            .get(id)
            .ok_or_else(|| SchemaError::TypeNotFound(id.to_string()))
    }

    /// Ancestor chain of `id`, root first, `id` last.
    fn lineage(&self, id: &str) -> SchemaResult<Vec<&TypeDefinition>> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(type_id) = current {
            let def = self.get(type_id)?;
            chain.push(def);
            current = def.parent_type_id.as_deref();
        }
        chain.reverse();
        Ok(chain)
    }

    fn declared(&self, id: &str) -> impl Iterator<Item = &PropertyDefinition> {
        self.properties.get(id).into_iter().flat_map(|m| m.values())
    }
}

/// Thread-safe in-memory [`TypeRegistry`].
#[derive(Debug)]
pub struct InMemoryTypeManager {
    catalog: Arc<PropertyCatalog>,
    table: RwLock<TypeTable>,
}

impl InMemoryTypeManager {
    /// A registry holding the four base types, resolving common properties
    /// through `catalog`.
    pub fn new(catalog: Arc<PropertyCatalog>) -> Self {
        let mut table = TypeTable::default();
        for base in BaseType::ALL {
            let def = TypeDefinition::base(base);
            table.types.insert(def.id.clone(), def);
        }
        Self {
            catalog,
            table: RwLock::new(table),
        }
    }

    pub fn catalog(&self) -> &PropertyCatalog {
        &self.catalog
    }

    fn check_definition(&self, table: &TypeTable, def: &TypeDefinition) -> SchemaResult<()> {
        let id = def.id.as_str();
        validate_type_id(id)?;

        let base = def
            .base_type
            .ok_or_else(|| SchemaError::invalid(id, "base type is not set"))?;
        let parent_id = def
            .parent_type_id
            .as_deref()
            .ok_or_else(|| SchemaError::invalid(id, "parent type is not set"))?;

        if table.types.contains_key(id) {
            return Err(SchemaError::invalid(id, "type already exists"));
        }
        let parent = table
            .types
            .get(parent_id)
            .ok_or_else(|| SchemaError::invalid(id, format!("parent type {parent_id} does not exist")))?;
        if parent.base_type != Some(base) {
            return Err(SchemaError::invalid(
                id,
                format!("base type {base} does not match parent {parent_id}"),
            ));
        }
        if def.fileable && !base.is_fileable() {
            return Err(SchemaError::invalid(id, format!("{base} types cannot be fileable")));
        }

        let inherited: Vec<&str> = table
            .lineage(parent_id)?
            .into_iter()
            .flat_map(|t| table.declared(&t.id))
            .map(|p| p.id.as_str())
            .collect();

        for (key, prop) in &def.property_definitions {
            validate_property_id(id, &prop.id)?;
            if key != &prop.id {
                return Err(SchemaError::invalid(
                    id,
                    format!("property key {key} does not match definition id {}", prop.id),
                ));
            }
            if self.catalog.is_reserved(&prop.id) {
                return Err(SchemaError::invalid(
                    id,
                    format!("property {} is reserved", prop.id),
                ));
            }
            if inherited.contains(&prop.id.as_str()) {
                return Err(SchemaError::invalid(
                    id,
                    format!("property {} is already declared by an ancestor", prop.id),
                ));
            }
        }
        Ok(())
    }

    fn effective(&self, table: &TypeTable, id: &str) -> SchemaResult<BTreeMap<String, PropertyDefinition>> {
        let lineage = table.lineage(id)?;
        let mut out = BTreeMap::new();
        if let Some(base) = lineage.first().and_then(|t| t.base_type) {
            for def in self.catalog.definitions_for(base) {
                out.insert(def.id.clone(), def.clone());
            }
        }
        for t in lineage {
            for def in table.declared(&t.id) {
                out.insert(def.id.clone(), def.clone());
            }
        }
        Ok(out)
    }

    fn materialize(
        &self,
        table: &TypeTable,
        def: &TypeDefinition,
        include_properties: bool,
    ) -> SchemaResult<TypeDefinition> {
        let mut copy = def.clone();
        if include_properties {
            copy.property_definitions = self.effective(table, &def.id)?;
        }
        Ok(copy)
    }
}

impl Default for InMemoryTypeManager {
    fn default() -> Self {
        Self::new(Arc::new(PropertyCatalog::standard()))
    }
}

impl TypeRegistry for InMemoryTypeManager {
    fn add_type(&self, mut definition: TypeDefinition) -> SchemaResult<()> {
        let mut table = self.table.write().map_err(|_| SchemaError::LockPoisoned)?;
        self.check_definition(&table, &definition)?;

        let properties = std::mem::take(&mut definition.property_definitions);
        info!(
            type_id = %definition.id,
            parent = definition.parent_type_id.as_deref().unwrap_or_default(),
            properties = properties.len(),
            "registered type"
        );
        table.properties.insert(definition.id.clone(), properties);
        table.types.insert(definition.id.clone(), definition);
        Ok(())
    }

    fn type_definition(&self, id: &str, include_properties: bool) -> SchemaResult<TypeDefinition> {
        let table = self.table.read().map_err(|_| SchemaError::LockPoisoned)?;
        let def = table.get(id)?;
        self.materialize(&table, def, include_properties)
    }

    fn remove_type(&self, id: &str) -> SchemaResult<TypeDefinition> {
        let mut table = self.table.write().map_err(|_| SchemaError::LockPoisoned)?;
        let mut def = table
            .types
            .remove(id)
            .ok_or_else(|| SchemaError::TypeNotFound(id.to_string()))?;
        def.property_definitions = table.properties.remove(id).unwrap_or_default();
        info!(type_id = %id, "removed type");
        Ok(def)
    }

    fn type_children(
        &self,
        id: Option<&str>,
        include_properties: bool,
    ) -> SchemaResult<Vec<TypeDefinition>> {
        let table = self.table.read().map_err(|_| SchemaError::LockPoisoned)?;
        if let Some(id) = id {
            table.get(id)?;
        }
        let mut children: Vec<&TypeDefinition> = table
            .types
            .values()
            .filter(|t| t.parent_type_id.as_deref() == id)
            .collect();
        children.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(parent = id.unwrap_or("<base>"), count = children.len(), "listed type children");
        children
            .into_iter()
            .map(|t| self.materialize(&table, t, include_properties))
            .collect()
    }

    fn effective_properties(&self, id: &str) -> SchemaResult<BTreeMap<String, PropertyDefinition>> {
        let table = self.table.read().map_err(|_| SchemaError::LockPoisoned)?;
        self.effective(&table, id)
    }
}
