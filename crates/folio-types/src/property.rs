use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::value::{PropertyType, Value};

/// Whether a property holds one value or many.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    Single,
    Multi,
}

/// When a property may be written by a caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Updatability {
    /// Maintained by the repository only.
    ReadOnly,
    /// Writable at any time.
    #[default]
    ReadWrite,
    /// Writable only while the object has not been persisted yet.
    OnCreate,
    /// Writable only on the private working copy of a document.
    WhenCheckedOut,
}

/// Declaration of one property of an object type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    /// Stable id, unique within a type's effective property set.
    pub id: String,
    pub query_name: String,
    pub local_name: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub property_type: PropertyType,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub updatability: Updatability,
    #[serde(default)]
    pub required: bool,
}

impl PropertyDefinition {
    /// A single-valued, optional, read-write property whose names all equal `id`.
    pub fn new(id: impl Into<String>, property_type: PropertyType) -> Self {
        let id = id.into();
        Self {
            query_name: id.clone(),
            local_name: id.clone(),
            display_name: id.clone(),
            id,
            description: None,
            property_type,
            cardinality: Cardinality::Single,
            updatability: Updatability::ReadWrite,
            required: false,
        }
    }

    pub fn multi(mut self) -> Self {
        self.cardinality = Cardinality::Multi;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn updatability(mut self, updatability: Updatability) -> Self {
        self.updatability = updatability;
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn query_name(mut self, name: impl Into<String>) -> Self {
        self.query_name = name.into();
        self
    }

    pub fn is_multi(&self) -> bool {
        self.cardinality == Cardinality::Multi
    }

    /// Check a candidate value against the declared type, cardinality, and
    /// required flag. `None` means the caller wants to unset the property.
    pub fn check_value(&self, value: Option<&Value>) -> Result<(), TypeError> {
        let Some(value) = value else {
            if self.required {
                return Err(TypeError::RequiredValueMissing {
                    property: self.id.clone(),
                });
            }
            return Ok(());
        };

        if value.property_type() != self.property_type {
            return Err(TypeError::TypeMismatch {
                property: self.id.clone(),
                expected: self.property_type.to_string(),
                actual: value.property_type().to_string(),
            });
        }

        if self.cardinality == Cardinality::Single && value.len() > 1 {
            return Err(TypeError::Cardinality {
                property: self.id.clone(),
                count: value.len(),
            });
        }

        if self.required && value.is_empty() {
            return Err(TypeError::RequiredValueMissing {
                property: self.id.clone(),
            });
        }

        Ok(())
    }
}
