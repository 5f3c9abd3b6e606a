use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::property::PropertyDefinition;

/// The four roots of the type hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BaseType {
    #[serde(rename = "cmis:document")]
    Document,
    #[serde(rename = "cmis:folder")]
    Folder,
    #[serde(rename = "cmis:policy")]
    Policy,
    #[serde(rename = "cmis:relationship")]
    Relationship,
}

impl BaseType {
    pub const ALL: [BaseType; 4] = [
        BaseType::Document,
        BaseType::Folder,
        BaseType::Policy,
        BaseType::Relationship,
    ];

    /// Type id of the root type for this base.
    pub fn id(&self) -> &'static str {
        match self {
            BaseType::Document => "cmis:document",
            BaseType::Folder => "cmis:folder",
            BaseType::Policy => "cmis:policy",
            BaseType::Relationship => "cmis:relationship",
        }
    }

    /// Whether instances can be placed in folders.
    pub fn is_fileable(&self) -> bool {
        !matches!(self, BaseType::Relationship)
    }

    /// Whether instances can be relationship endpoints.
    pub fn is_independent(&self) -> bool {
        !matches!(self, BaseType::Relationship)
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for BaseType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BaseType::ALL
            .into_iter()
            .find(|b| b.id() == s)
            .ok_or_else(|| TypeError::UnknownBaseType(s.to_string()))
    }
}

/// Whether documents of a type carry a content stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStreamAllowed {
    #[default]
    Allowed,
    Required,
    #[serde(rename = "notallowed")]
    NotAllowed,
}

/// An object type.
///
/// `property_definitions` holds only the properties declared by this type.
/// The effective set (catalog + ancestors + declared) is assembled by the
/// type manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeDefinition {
    pub id: String,
    pub local_name: String,
    pub display_name: String,
    pub query_name: String,
    pub description: Option<String>,
    pub base_type: Option<BaseType>,
    /// `None` only for the four base roots.
    pub parent_type_id: Option<String>,
    pub creatable: bool,
    pub fileable: bool,
    pub queryable: bool,
    pub controllable_policy: bool,
    pub controllable_acl: bool,
    /// Document types only.
    pub versionable: bool,
    /// Document types only.
    pub content_stream_allowed: ContentStreamAllowed,
    /// Relationship types only. Empty means any type is accepted.
    pub allowed_source_types: Vec<String>,
    /// Relationship types only. Empty means any type is accepted.
    pub allowed_target_types: Vec<String>,
    pub property_definitions: BTreeMap<String, PropertyDefinition>,
}

impl Default for TypeDefinition {
    fn default() -> Self {
        Self {
            id: String::new(),
            local_name: String::new(),
            display_name: String::new(),
            query_name: String::new(),
            description: None,
            base_type: None,
            parent_type_id: None,
            creatable: true,
            fileable: true,
            queryable: true,
            controllable_policy: false,
            controllable_acl: false,
            versionable: false,
            content_stream_allowed: ContentStreamAllowed::Allowed,
            allowed_source_types: Vec::new(),
            allowed_target_types: Vec::new(),
            property_definitions: BTreeMap::new(),
        }
    }
}

impl TypeDefinition {
    /// The root type of a base type.
    pub fn base(base: BaseType) -> Self {
        let mut def = Self::named(base.id());
        def.base_type = Some(base);
        def.fileable = base.is_fileable();
        def.controllable_acl = true;
        def.controllable_policy = true;
        def.versionable = base == BaseType::Document;
        def
    }

    /// A custom type deriving from `parent`.
    pub fn derived(id: impl Into<String>, base: BaseType, parent: impl Into<String>) -> Self {
        let mut def = Self::named(id);
        def.base_type = Some(base);
        def.parent_type_id = Some(parent.into());
        def.fileable = base.is_fileable();
        def
    }

    fn named(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            local_name: id.clone(),
            display_name: id.clone(),
            query_name: id.clone(),
            id,
            ..Default::default()
        }
    }

    pub fn with_property(mut self, def: PropertyDefinition) -> Self {
        self.property_definitions.insert(def.id.clone(), def);
        self
    }

    pub fn versionable(mut self, versionable: bool) -> Self {
        self.versionable = versionable;
        self
    }

    pub fn content_stream(mut self, allowed: ContentStreamAllowed) -> Self {
        self.content_stream_allowed = allowed;
        self
    }

    pub fn controllable(mut self, acl: bool, policy: bool) -> Self {
        self.controllable_acl = acl;
        self.controllable_policy = policy;
        self
    }

    pub fn allowed_endpoints(mut self, sources: Vec<String>, targets: Vec<String>) -> Self {
        self.allowed_source_types = sources;
        self.allowed_target_types = targets;
        self
    }

    /// Returns `true` for one of the four base roots.
    pub fn is_base(&self) -> bool {
        self.parent_type_id.is_none()
            && self.base_type.map(|b| b.id() == self.id).unwrap_or(false)
    }

    /// Copy of this definition without property definitions.
    pub fn without_properties(&self) -> Self {
        Self {
            property_definitions: BTreeMap::new(),
            ..self.clone()
        }
    }
}
