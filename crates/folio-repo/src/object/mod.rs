//! Object facades.
//!
//! A facade is a view over one object: its type definition (with the
//! effective property set) plus either a transient [`Entry`] it owns or the
//! id of a persisted entry. Persisted facades hold no copy of the entry;
//! every read goes to the store, so all facades over one id observe the
//! same state.

mod document;
mod folder;
mod policy;
mod relationship;

use std::collections::BTreeMap;

pub use document::{CheckinRequest, Document};
pub use folder::Folder;
pub use policy::Policy;
pub use relationship::{Relationship, RelationshipDirection};

use folio_store::Entry;
use folio_types::{props, Acl, BaseType, ObjectId, TypeDefinition, Value};

use crate::connection::Connection;
use crate::create::CreateOptions;
use crate::error::{RepoError, RepoResult};
use crate::properties::{apply_updates, Properties, PropertyFilter, WriteContext};

#[derive(Clone, Debug)]
enum ObjectState {
    /// Not yet saved; the facade owns the entry.
    Transient(Box<Entry>),
    Persisted(ObjectId),
}

/// Behaviour common to every object facade.
#[derive(Clone)]
pub struct ObjectCore {
    conn: Connection,
    definition: TypeDefinition,
    state: ObjectState,
}

impl ObjectCore {
    pub(crate) fn transient(conn: Connection, definition: TypeDefinition, entry: Entry) -> Self {
        Self {
            conn,
            definition,
            state: ObjectState::Transient(Box::new(entry)),
        }
    }

    pub(crate) fn persisted(conn: Connection, definition: TypeDefinition, id: ObjectId) -> Self {
        Self {
            conn,
            definition,
            state: ObjectState::Persisted(id),
        }
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    // ---- Identity ----

    /// The object id, or `None` while the object is new.
    pub fn id(&self) -> Option<&ObjectId> {
        match &self.state {
            ObjectState::Transient(_) => None,
            ObjectState::Persisted(id) => Some(id),
        }
    }

    /// The object id, failing with `Runtime` if the object was never saved.
    pub fn require_id(&self) -> RepoResult<&ObjectId> {
        self.id().ok_or_else(|| {
            RepoError::Runtime(format!(
                "{} object has not been saved",
                self.definition.id
            ))
        })
    }

    pub fn is_new(&self) -> bool {
        matches!(self.state, ObjectState::Transient(_))
    }

    /// Type definition with the effective property set.
    pub fn type_definition(&self) -> &TypeDefinition {
        &self.definition
    }

    pub fn type_id(&self) -> &str {
        &self.definition.id
    }

    pub fn base_type(&self) -> BaseType {
        // Registered types always carry a base type.
        self.definition.base_type.unwrap_or(BaseType::Document)
    }

    // ---- Properties ----

    /// All properties defined for the type that currently have a value.
    pub fn properties(&self) -> RepoResult<BTreeMap<String, Value>> {
        match &self.state {
            ObjectState::Transient(entry) => Ok(entry
                .properties()
                .iter()
                .filter(|(k, _)| self.definition.property_definitions.contains_key(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            ObjectState::Persisted(id) => self.conn.project(id, &self.definition),
        }
    }

    /// One property, `None` when unset or not defined for the type.
    pub fn property(&self, property_id: &str) -> RepoResult<Option<Value>> {
        if !self.definition.property_definitions.contains_key(property_id) {
            return Ok(None);
        }
        Ok(self.properties()?.remove(property_id))
    }

    /// Properties whose query names pass `filter`.
    pub fn subset(&self, filter: &PropertyFilter) -> RepoResult<BTreeMap<String, Value>> {
        let defs = &self.definition.property_definitions;
        Ok(self
            .properties()?
            .into_iter()
            .filter(|(k, _)| defs.get(k).is_some_and(|d| filter.matches(&d.query_name)))
            .collect())
    }

    pub fn string(&self, property_id: &str) -> RepoResult<Option<String>> {
        Ok(self
            .property(property_id)?
            .and_then(|v| v.as_str().map(String::from)))
    }

    pub(crate) fn flag(&self, property_id: &str) -> RepoResult<bool> {
        Ok(self
            .property(property_id)?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    pub fn name(&self) -> RepoResult<Option<String>> {
        self.string(props::NAME)
    }

    pub fn change_token(&self) -> RepoResult<Option<String>> {
        self.string(props::CHANGE_TOKEN)
    }

    /// Validate and apply a batch of property writes.
    pub fn update_properties(
        &mut self,
        updates: &Properties,
        change_token: Option<&str>,
    ) -> RepoResult<()> {
        match &mut self.state {
            ObjectState::Transient(entry) => {
                apply_updates(
                    entry,
                    &self.definition.property_definitions,
                    updates,
                    WriteContext::creating(),
                )?;
                Ok(())
            }
            ObjectState::Persisted(id) => self.conn.update_properties(id, updates, change_token),
        }
    }

    pub fn set_property(&mut self, property_id: &str, value: Option<Value>) -> RepoResult<()> {
        let mut updates = Properties::new();
        updates.set(property_id, value);
        self.update_properties(&updates, None)
    }

    /// Rename the object. Empty names are a `NameConstraintViolation`.
    pub fn set_name(&mut self, name: &str) -> RepoResult<()> {
        self.set_property(props::NAME, Some(Value::string(name)))
    }

    // ---- Policies and ACL ----

    pub fn apply_policy(&self, policy: &Policy) -> RepoResult<()> {
        let policy_id = policy.id().ok_or_else(|| {
            RepoError::Runtime("cannot apply a policy that has not been saved".into())
        })?;
        self.conn.apply_policy(policy_id, self.require_id()?)
    }

    pub fn remove_policy(&self, policy: &Policy) -> RepoResult<()> {
        let policy_id = policy.id().ok_or_else(|| {
            RepoError::Runtime("cannot remove a policy that has not been saved".into())
        })?;
        self.conn.remove_policy(policy_id, self.require_id()?)
    }

    pub fn applied_policies(&self) -> RepoResult<Vec<ObjectId>> {
        match &self.state {
            ObjectState::Transient(entry) => Ok(entry.policies().iter().cloned().collect()),
            ObjectState::Persisted(id) => self.conn.applied_policies(id),
        }
    }

    pub fn acl(&self) -> RepoResult<Acl> {
        self.check_controllable_acl()?;
        match &self.state {
            ObjectState::Transient(entry) => Ok(entry.acl().clone()),
            ObjectState::Persisted(id) => self.conn.acl(id),
        }
    }

    /// Merge `add` then `remove` into the ACL, returning the result.
    pub fn apply_acl(&mut self, add: &Acl, remove: &Acl) -> RepoResult<Acl> {
        self.check_controllable_acl()?;
        match &mut self.state {
            ObjectState::Transient(entry) => {
                let merged = entry.acl().merged(add, remove);
                entry.set_acl(merged.clone());
                Ok(merged)
            }
            ObjectState::Persisted(id) => self.conn.apply_acl(id, add, remove),
        }
    }

    fn check_controllable_acl(&self) -> RepoResult<()> {
        if !self.definition.controllable_acl {
            return Err(RepoError::constraint(format!(
                "type {} is not ACL-controllable",
                self.definition.id
            )));
        }
        Ok(())
    }

    // ---- Hierarchy ----

    /// The single parent folder. `None` for unfiled or unsaved objects.
    pub fn parent(&self) -> RepoResult<Option<Folder>> {
        let Some(id) = self.id() else {
            return Ok(None);
        };
        match self.conn.parent(id)? {
            Some(parent) => Ok(Some(self.conn.folder(&parent)?)),
            None => Ok(None),
        }
    }

    pub fn parents(&self) -> RepoResult<Vec<Folder>> {
        let Some(id) = self.id() else {
            return Ok(Vec::new());
        };
        self.conn
            .parents(id)?
            .iter()
            .map(|p| self.conn.folder(p))
            .collect()
    }

    pub fn relationships(
        &self,
        direction: RelationshipDirection,
        type_id: Option<&str>,
        include_subtypes: bool,
    ) -> RepoResult<Vec<Relationship>> {
        let Some(id) = self.id() else {
            return Ok(Vec::new());
        };
        self.conn
            .relationships(id, direction, type_id, include_subtypes)?
            .iter()
            .map(|r| self.conn.object(r)?.into_relationship())
            .collect()
    }

    // ---- Persistence ----

    /// Persist a new object. Fails with `Runtime` if it was already saved.
    pub fn save(&mut self, options: CreateOptions) -> RepoResult<ObjectId> {
        let ObjectState::Transient(entry) = &self.state else {
            return Err(RepoError::Runtime(format!(
                "object {} is already saved",
                self.id().map(ObjectId::as_str).unwrap_or_default()
            )));
        };
        let id = self.conn.persist(entry, &self.definition, options)?;
        self.state = ObjectState::Persisted(id.clone());
        Ok(id)
    }

    /// Delete the object. Documents take every version with them when
    /// `all_versions` is set.
    pub fn delete(&self, all_versions: bool) -> RepoResult<()> {
        self.conn.delete_object(self.require_id()?, all_versions)
    }
}

impl std::fmt::Debug for ObjectCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectCore")
            .field("type_id", &self.definition.id)
            .field("state", &self.state)
            .finish()
    }
}

/// Any object facade, discriminated by base type.
#[derive(Clone, Debug)]
pub enum CmisObject {
    Document(Document),
    Folder(Folder),
    Policy(Policy),
    Relationship(Relationship),
}

impl CmisObject {
    pub(crate) fn from_core(core: ObjectCore) -> Self {
        match core.base_type() {
            BaseType::Document => CmisObject::Document(Document::from_core(core)),
            BaseType::Folder => CmisObject::Folder(Folder::from_core(core)),
            BaseType::Policy => CmisObject::Policy(Policy::from_core(core)),
            BaseType::Relationship => CmisObject::Relationship(Relationship::from_core(core)),
        }
    }

    pub fn core(&self) -> &ObjectCore {
        match self {
            CmisObject::Document(d) => &**d,
            CmisObject::Folder(f) => &**f,
            CmisObject::Policy(p) => &**p,
            CmisObject::Relationship(r) => &**r,
        }
    }

    pub fn core_mut(&mut self) -> &mut ObjectCore {
        match self {
            CmisObject::Document(d) => &mut **d,
            CmisObject::Folder(f) => &mut **f,
            CmisObject::Policy(p) => &mut **p,
            CmisObject::Relationship(r) => &mut **r,
        }
    }

    pub fn base_type(&self) -> BaseType {
        self.core().base_type()
    }

    pub fn id(&self) -> Option<&ObjectId> {
        self.core().id()
    }

    pub fn into_document(self) -> RepoResult<Document> {
        match self {
            CmisObject::Document(d) => Ok(d),
            other => Err(other.wrong_base(BaseType::Document)),
        }
    }

    pub fn into_folder(self) -> RepoResult<Folder> {
        match self {
            CmisObject::Folder(f) => Ok(f),
            other => Err(other.wrong_base(BaseType::Folder)),
        }
    }

    pub fn into_policy(self) -> RepoResult<Policy> {
        match self {
            CmisObject::Policy(p) => Ok(p),
            other => Err(other.wrong_base(BaseType::Policy)),
        }
    }

    pub fn into_relationship(self) -> RepoResult<Relationship> {
        match self {
            CmisObject::Relationship(r) => Ok(r),
            other => Err(other.wrong_base(BaseType::Relationship)),
        }
    }

    fn wrong_base(&self, expected: BaseType) -> RepoError {
        RepoError::invalid(format!(
            "object {} is a {}, not a {expected}",
            self.id().map(ObjectId::as_str).unwrap_or("<new>"),
            self.base_type()
        ))
    }
}

/// Implements `Deref<Target = ObjectCore>` and the constructor for a facade.
macro_rules! facade {
    ($name:ident) => {
        impl $name {
            pub(crate) fn from_core(core: $crate::object::ObjectCore) -> Self {
                Self { core }
            }

            pub fn into_core(self) -> $crate::object::ObjectCore {
                self.core
            }
        }

        impl std::ops::Deref for $name {
            type Target = $crate::object::ObjectCore;

            fn deref(&self) -> &Self::Target {
                &self.core
            }
        }

        impl std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.core
            }
        }
    };
}

pub(crate) use facade;
