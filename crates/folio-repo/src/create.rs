//! Object creation and copying.

use tracing::info;

use folio_store::{Entry, StoreState};
use folio_types::{
    props, Acl, BaseType, ContentStream, ContentStreamAllowed, ObjectId, TypeDefinition,
    Updatability, Value,
};

use crate::connection::Connection;
use crate::error::{RepoError, RepoResult};
use crate::filing;
use crate::object::{CmisObject, Document, Folder, ObjectCore, Policy, Relationship};
use crate::properties::{apply_updates, check_required, stamp_created, Properties, WriteContext};
use crate::versioning::{self, VersioningState};

/// Placement and initial state for a new object.
#[derive(Clone, Debug, Default)]
pub struct CreateOptions {
    /// Folder to file the object in. Required for folders, forbidden for
    /// relationships, optional (unfiled) otherwise.
    pub parent: Option<ObjectId>,
    pub content: Option<ContentStream>,
    pub acl: Option<Acl>,
    pub policies: Vec<ObjectId>,
    /// Documents only. `None` picks `Major` for versionable types and
    /// [`VersioningState::None`] otherwise.
    pub versioning_state: Option<VersioningState>,
}

impl CreateOptions {
    pub fn in_folder(parent: &ObjectId) -> Self {
        Self {
            parent: Some(parent.clone()),
            ..Default::default()
        }
    }

    pub fn content(mut self, content: ContentStream) -> Self {
        self.content = Some(content);
        self
    }

    pub fn acl(mut self, acl: Acl) -> Self {
        self.acl = Some(acl);
        self
    }

    pub fn policy(mut self, policy: ObjectId) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn versioning(mut self, state: VersioningState) -> Self {
        self.versioning_state = Some(state);
        self
    }
}

/// A complete create request: type, initial properties, and placement.
#[derive(Clone, Debug)]
pub struct NewObject {
    pub type_id: String,
    pub properties: Properties,
    pub options: CreateOptions,
}

impl NewObject {
    pub fn new(type_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            properties: Properties::new().with(props::NAME, name.into()),
            options: CreateOptions::default(),
        }
    }

    pub fn in_folder(mut self, parent: &ObjectId) -> Self {
        self.options.parent = Some(parent.clone());
        self
    }

    pub fn property(mut self, id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.set(id, Some(value.into()));
        self
    }

    pub fn properties(mut self, properties: Properties) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn content(mut self, content: ContentStream) -> Self {
        self.options.content = Some(content);
        self
    }

    pub fn acl(mut self, acl: Acl) -> Self {
        self.options.acl = Some(acl);
        self
    }

    pub fn policy(mut self, policy: ObjectId) -> Self {
        self.options.policies.push(policy);
        self
    }

    pub fn versioning(mut self, state: VersioningState) -> Self {
        self.options.versioning_state = Some(state);
        self
    }
}

impl Connection {
    // -----------------------------------------------------------------------
    // Transient objects
    // -----------------------------------------------------------------------

    /// A new, unsaved object of `type_id`. Set its properties, then call
    /// [`ObjectCore::save`].
    pub fn new_object(&self, type_id: &str) -> RepoResult<CmisObject> {
        let definition = self.definition(type_id)?;
        let base = base_of(&definition)?;
        let entry = Entry::new(base, type_id);
        Ok(CmisObject::from_core(ObjectCore::transient(
            self.clone(),
            definition,
            entry,
        )))
    }

    pub fn new_document(&self, type_id: &str) -> RepoResult<Document> {
        self.new_object(type_id)?.into_document()
    }

    pub fn new_folder(&self, type_id: &str) -> RepoResult<Folder> {
        self.new_object(type_id)?.into_folder()
    }

    pub fn new_policy(&self, type_id: &str) -> RepoResult<Policy> {
        self.new_object(type_id)?.into_policy()
    }

    pub fn new_relationship(&self, type_id: &str) -> RepoResult<Relationship> {
        self.new_object(type_id)?.into_relationship()
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Create and persist an object, returning its id.
    pub fn create_object(&self, request: NewObject) -> RepoResult<ObjectId> {
        let definition = self.definition(&request.type_id)?;
        let mut entry = Entry::new(base_of(&definition)?, request.type_id.as_str());
        apply_updates(
            &mut entry,
            &definition.property_definitions,
            &request.properties,
            WriteContext::creating(),
        )?;
        self.persist(&entry, &definition, request.options)
    }

    pub fn create_folder(&self, parent: &ObjectId, name: &str) -> RepoResult<Folder> {
        let id = self.create_object(NewObject::new(BaseType::Folder.id(), name).in_folder(parent))?;
        self.folder(&id)
    }

    /// Create a document of the base document type.
    pub fn create_document(
        &self,
        parent: &ObjectId,
        name: &str,
        content: Option<ContentStream>,
    ) -> RepoResult<Document> {
        let mut request = NewObject::new(BaseType::Document.id(), name).in_folder(parent);
        request.options.content = content;
        let id = self.create_object(request)?;
        self.document(&id)
    }

    pub fn create_policy(
        &self,
        parent: Option<&ObjectId>,
        name: &str,
        text: &str,
    ) -> RepoResult<Policy> {
        let mut request =
            NewObject::new(BaseType::Policy.id(), name).property(props::POLICY_TEXT, text);
        request.options.parent = parent.cloned();
        let id = self.create_object(request)?;
        Ok(self.object(&id)?.into_policy()?)
    }

    pub fn create_relationship(
        &self,
        type_id: &str,
        name: &str,
        source: &ObjectId,
        target: &ObjectId,
    ) -> RepoResult<Relationship> {
        let request = NewObject::new(type_id, name)
            .property(props::SOURCE_ID, source.as_str())
            .property(props::TARGET_ID, target.as_str());
        let id = self.create_object(request)?;
        self.object(&id)?.into_relationship()
    }

    /// Copy the latest version of `source` into `target_folder` as a new,
    /// independent document. `overrides` are applied over the copied
    /// properties.
    pub fn copy_document(
        &self,
        source: &ObjectId,
        target_folder: &ObjectId,
        overrides: Properties,
        versioning_state: Option<VersioningState>,
    ) -> RepoResult<ObjectId> {
        let original = self.inner().read(|s| {
            let latest = latest_member(s, source)?;
            Ok(s.require(&latest)?.clone())
        })?;
        let definition = self.definition(original.type_id())?;

        let mut properties: Properties = original
            .properties()
            .iter()
            .filter(|(id, _)| {
                definition.property_definitions.get(*id).is_some_and(|d| {
                    matches!(d.updatability, Updatability::ReadWrite | Updatability::OnCreate)
                })
            })
            .map(|(id, v)| (id.clone(), v.clone()))
            .collect();
        properties.extend(overrides);

        let acl = (definition.controllable_acl && !original.acl().is_empty())
            .then(|| original.acl().clone());
        let request = NewObject {
            type_id: original.type_id().to_string(),
            properties,
            options: CreateOptions {
                parent: Some(target_folder.clone()),
                content: original.content().cloned(),
                acl,
                policies: Vec::new(),
                versioning_state,
            },
        };
        let id = self.create_object(request)?;
        info!(source = %source, copy = %id, folder = %target_folder, "copied document");
        Ok(id)
    }

    /// Persist a transient entry. Runs every creation check, then inserts,
    /// files, and indexes the object under one write lock.
    pub(crate) fn persist(
        &self,
        entry: &Entry,
        definition: &TypeDefinition,
        options: CreateOptions,
    ) -> RepoResult<ObjectId> {
        let base = entry.base_type();
        if !definition.creatable {
            return Err(RepoError::constraint(format!(
                "type {} is not creatable",
                definition.id
            )));
        }
        check_required(entry, &definition.property_definitions)?;
        let versioning_state = resolve_versioning_state(definition, options.versioning_state)?;
        check_content(definition, base, options.content.as_ref())?;
        if options.acl.is_some() && !definition.controllable_acl {
            return Err(RepoError::constraint(format!(
                "type {} is not ACL-controllable",
                definition.id
            )));
        }
        if !options.policies.is_empty() && !definition.controllable_policy {
            return Err(RepoError::constraint(format!(
                "type {} is not policy-controllable",
                definition.id
            )));
        }

        let principal = self.principal().to_string();
        let mut entry = entry.clone();
        if let Some(acl) = &options.acl {
            entry.set_acl(Acl::new().merged(acl, &Acl::new()));
        }
        entry.set_content(options.content);
        stamp_created(&mut entry, &principal);
        let series_id = (base == BaseType::Document)
            .then(|| versioning::start_series(&mut entry, versioning_state, &principal));
        let name = entry.name().unwrap_or_default().to_string();
        let type_id = definition.id.clone();

        self.inner().write(|s| {
            match (&options.parent, base) {
                (Some(_), BaseType::Relationship) => {
                    return Err(RepoError::constraint("relationships cannot be filed"));
                }
                (Some(parent), _) => {
                    if !definition.fileable {
                        return Err(RepoError::constraint(format!(
                            "type {type_id} is not fileable"
                        )));
                    }
                    filing::check_placement(s, parent, &type_id, &name, None)?;
                }
                (None, BaseType::Folder) => {
                    return Err(RepoError::constraint("a folder must be created in a parent folder"));
                }
                (None, _) => {}
            }
            let endpoints = match base {
                BaseType::Relationship => Some(check_endpoints(s, &entry, definition)?),
                _ => None,
            };
            for policy in &options.policies {
                require_policy(s, policy)?;
                entry.add_policy(policy.clone());
            }
            if let (BaseType::Folder, Some(parent)) = (base, &options.parent) {
                entry.set_value(props::PARENT_ID, Some(Value::string(parent.as_str())));
            }

            let id = s.insert(entry)?;
            if let Some(parent) = &options.parent {
                s.filing_mut().file(parent, &id);
            }
            if let Some(series_id) = &series_id {
                versioning::register_member(
                    s,
                    series_id,
                    &id,
                    versioning_state == VersioningState::CheckedOut,
                )?;
            }
            if let Some((source, target)) = &endpoints {
                s.edges_mut().link(&id, source, target);
            }
            for policy in &options.policies {
                s.policies_mut().apply(policy, &id);
            }
            info!(id = %id, type_id = %type_id, base = %base, principal = %principal, "created object");
            Ok(id)
        })
    }
}

fn base_of(definition: &TypeDefinition) -> RepoResult<BaseType> {
    definition.base_type.ok_or_else(|| {
        RepoError::Runtime(format!("type {} has no base type", definition.id))
    })
}

fn resolve_versioning_state(
    definition: &TypeDefinition,
    requested: Option<VersioningState>,
) -> RepoResult<VersioningState> {
    let is_document = definition.base_type == Some(BaseType::Document);
    match (is_document && definition.versionable, requested) {
        (true, None) => Ok(VersioningState::Major),
        (true, Some(VersioningState::None)) => Err(RepoError::constraint(format!(
            "type {} is versionable; a versioning state is required",
            definition.id
        ))),
        (true, Some(state)) => Ok(state),
        (false, None | Some(VersioningState::None)) => Ok(VersioningState::None),
        (false, Some(state)) => Err(RepoError::constraint(format!(
            "type {} is not versionable; versioning state {state:?} is not allowed",
            definition.id
        ))),
    }
}

fn check_content(
    definition: &TypeDefinition,
    base: BaseType,
    content: Option<&ContentStream>,
) -> RepoResult<()> {
    if base != BaseType::Document {
        if content.is_some() {
            return Err(RepoError::constraint(format!(
                "{base} objects cannot carry content"
            )));
        }
        return Ok(());
    }
    match (definition.content_stream_allowed, content.is_some()) {
        (ContentStreamAllowed::NotAllowed, true) => Err(RepoError::constraint(format!(
            "type {} does not allow content",
            definition.id
        ))),
        (ContentStreamAllowed::Required, false) => Err(RepoError::constraint(format!(
            "type {} requires content",
            definition.id
        ))),
        _ => Ok(()),
    }
}

/// Validate both ends of a relationship entry.
fn check_endpoints(
    state: &StoreState,
    entry: &Entry,
    definition: &TypeDefinition,
) -> RepoResult<(ObjectId, ObjectId)> {
    let source = endpoint(state, entry, props::SOURCE_ID, &definition.allowed_source_types)?;
    let target = endpoint(state, entry, props::TARGET_ID, &definition.allowed_target_types)?;
    Ok((source, target))
}

fn endpoint(
    state: &StoreState,
    entry: &Entry,
    property_id: &str,
    allowed: &[String],
) -> RepoResult<ObjectId> {
    let raw = entry
        .string(property_id)
        .ok_or_else(|| RepoError::constraint(format!("{property_id} is required")))?;
    let id = ObjectId::new(raw)?;
    let target = state.require(&id)?;
    if !target.base_type().is_independent() {
        return Err(RepoError::constraint(format!(
            "{property_id} {id} is a relationship; endpoints must be independent objects"
        )));
    }
    if !allowed.is_empty() && !allowed.iter().any(|t| t == target.type_id()) {
        return Err(RepoError::constraint(format!(
            "{property_id} {id} has type {}, which {} does not accept",
            target.type_id(),
            entry.type_id()
        )));
    }
    Ok(id)
}

pub(crate) fn require_policy(state: &StoreState, id: &ObjectId) -> RepoResult<()> {
    if state.require(id)?.base_type() != BaseType::Policy {
        return Err(RepoError::invalid(format!("{id} is not a policy")));
    }
    Ok(())
}

/// The newest checked-in version of the series containing `id`.
pub(crate) fn latest_member(state: &StoreState, id: &ObjectId) -> RepoResult<ObjectId> {
    let series_id = versioning::series_id_of(state, id)?;
    let series = state.series(&series_id).ok_or_else(|| {
        RepoError::ObjectNotFound(format!("version series {series_id}"))
    })?;
    series
        .checked_in()
        .next()
        .or(series.checked_out())
        .cloned()
        .ok_or_else(|| RepoError::ObjectNotFound(format!("version series {series_id} is empty")))
}
