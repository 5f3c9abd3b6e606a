use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use folio_schema::TypeTree;
use folio_types::{
    props, Acl, BaseType, ContentStream, ContentStreamAllowed, ObjectId, TypeDefinition, Value,
    VersionSeriesId,
};

use crate::create::{latest_member, require_policy};
use crate::error::{RepoError, RepoResult};
use crate::filing;
use crate::integrity;
use crate::object::{CheckinRequest, CmisObject, Document, Folder, ObjectCore, RelationshipDirection};
use crate::properties::{apply_updates, check_change_token, touch, Properties, WriteContext};
use crate::repository::RepositoryInner;
use crate::versioning;

/// A caller's handle on a repository.
///
/// Every mutation is attributed to the connection's principal. Connections
/// are cheap to clone and safe to share between threads.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<RepositoryInner>,
    principal: Arc<str>,
}

impl Connection {
    pub(crate) fn new(inner: Arc<RepositoryInner>, principal: String) -> Self {
        Self {
            inner,
            principal: principal.into(),
        }
    }

    pub(crate) fn inner(&self) -> &RepositoryInner {
        &self.inner
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn root_folder_id(&self) -> &ObjectId {
        &self.inner.root_id
    }

    /// Type definition with its effective property set.
    pub(crate) fn definition(&self, type_id: &str) -> RepoResult<TypeDefinition> {
        Ok(self.inner.types.type_definition(type_id, true)?)
    }

    fn definition_of(&self, id: &ObjectId) -> RepoResult<TypeDefinition> {
        let type_id = self
            .inner
            .read(|s| Ok(s.require(id)?.type_id().to_string()))?;
        self.definition(&type_id)
    }

    // -----------------------------------------------------------------------
    // Retrieval
    // -----------------------------------------------------------------------

    pub fn object(&self, id: &ObjectId) -> RepoResult<CmisObject> {
        let definition = self.definition_of(id)?;
        Ok(CmisObject::from_core(ObjectCore::persisted(
            self.clone(),
            definition,
            id.clone(),
        )))
    }

    pub fn object_by_path(&self, path: &str) -> RepoResult<CmisObject> {
        let id = self
            .inner
            .read(|s| filing::resolve_path(s, path, &self.inner.root_id))?;
        self.object(&id)
    }

    pub fn root_folder(&self) -> RepoResult<Folder> {
        self.folder(&self.inner.root_id)
    }

    pub fn document(&self, id: &ObjectId) -> RepoResult<Document> {
        self.object(id)?.into_document()
    }

    pub fn folder(&self, id: &ObjectId) -> RepoResult<Folder> {
        self.object(id)?.into_folder()
    }

    /// Stored values of `id` projected through `definition`, plus the
    /// computed path of folders.
    pub(crate) fn project(
        &self,
        id: &ObjectId,
        definition: &TypeDefinition,
    ) -> RepoResult<BTreeMap<String, Value>> {
        self.inner.read(|s| {
            let entry = s.require(id)?;
            let mut out: BTreeMap<String, Value> = entry
                .properties()
                .iter()
                .filter(|(k, _)| definition.property_definitions.contains_key(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            if entry.base_type() == BaseType::Folder {
                let path = filing::folder_path(s, id, &self.inner.root_id)?;
                out.insert(props::PATH.to_string(), Value::string(path));
            }
            Ok(out)
        })
    }

    /// All defined properties of an object.
    pub fn properties(&self, id: &ObjectId) -> RepoResult<BTreeMap<String, Value>> {
        let definition = self.definition_of(id)?;
        self.project(id, &definition)
    }

    // -----------------------------------------------------------------------
    // Updates
    // -----------------------------------------------------------------------

    /// Validate and apply property writes. A supplied `change_token` must
    /// match the object's current token.
    pub fn update_properties(
        &self,
        id: &ObjectId,
        updates: &Properties,
        change_token: Option<&str>,
    ) -> RepoResult<()> {
        let definition = self.definition_of(id)?;
        let enforce = self.inner.config.enforce_change_tokens;
        self.inner.write(|s| {
            let current = s.require(id)?;
            check_change_token(current, change_token, enforce)?;
            let ctx = WriteContext {
                is_new: false,
                is_pwc: versioning::is_pwc(s, id),
            };
            let mut updated = current.clone();
            let changed = apply_updates(
                &mut updated,
                &definition.property_definitions,
                updates,
                ctx,
            )?;
            if changed == 0 {
                return Ok(());
            }
            if updated.name() != current.name() {
                if let Some(name) = updated.name() {
                    for parent in s.filing().parents(id) {
                        filing::check_unique_name(s, parent, name, Some(id))?;
                    }
                }
            }
            touch(&mut updated, &self.principal);
            *s.require_mut(id)? = updated;
            info!(id = %id, changed, principal = %self.principal, "updated properties");
            Ok(())
        })
    }

    pub fn content_stream(&self, id: &ObjectId) -> RepoResult<Option<ContentStream>> {
        self.inner.read(|s| {
            let entry = s.require(id)?;
            require_document(entry.base_type(), id)?;
            Ok(entry.content().cloned())
        })
    }

    pub fn set_content_stream(
        &self,
        id: &ObjectId,
        content: ContentStream,
        overwrite: bool,
        change_token: Option<&str>,
    ) -> RepoResult<()> {
        let definition = self.definition_of(id)?;
        let enforce = self.inner.config.enforce_change_tokens;
        self.inner.write(|s| {
            let entry = s.require(id)?;
            require_document(entry.base_type(), id)?;
            check_change_token(entry, change_token, enforce)?;
            if definition.content_stream_allowed == ContentStreamAllowed::NotAllowed {
                return Err(RepoError::constraint(format!(
                    "type {} does not allow content",
                    definition.id
                )));
            }
            if entry.content().is_some() && !overwrite {
                return Err(RepoError::constraint(format!(
                    "document {id} already has content"
                )));
            }
            let len = content.len();
            s.set_content(id, Some(content))?;
            touch(s.require_mut(id)?, &self.principal);
            info!(id = %id, bytes = len, "set content stream");
            Ok(())
        })
    }

    pub fn delete_content_stream(&self, id: &ObjectId, change_token: Option<&str>) -> RepoResult<()> {
        let definition = self.definition_of(id)?;
        let enforce = self.inner.config.enforce_change_tokens;
        self.inner.write(|s| {
            let entry = s.require(id)?;
            require_document(entry.base_type(), id)?;
            check_change_token(entry, change_token, enforce)?;
            if definition.content_stream_allowed == ContentStreamAllowed::Required {
                return Err(RepoError::constraint(format!(
                    "type {} requires content",
                    definition.id
                )));
            }
            if entry.content().is_none() {
                return Ok(());
            }
            s.set_content(id, None)?;
            touch(s.require_mut(id)?, &self.principal);
            info!(id = %id, "deleted content stream");
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Filing
    // -----------------------------------------------------------------------

    /// Move an object from `source` (required when it is multi-filed) into
    /// `target`.
    pub fn move_object(
        &self,
        id: &ObjectId,
        target: &ObjectId,
        source: Option<&ObjectId>,
    ) -> RepoResult<()> {
        let root = &self.inner.root_id;
        self.inner.write(|s| {
            if id == root {
                return Err(RepoError::constraint("the root folder cannot be moved"));
            }
            let entry = s.require(id)?;
            let base = entry.base_type();
            if !base.is_fileable() {
                return Err(RepoError::constraint(format!("{base} objects are not fileable")));
            }
            let type_id = entry.type_id().to_string();
            let name = entry.name().unwrap_or_default().to_string();
            filing::require_folder(s, target)?;

            let source = match source {
                Some(src) if s.filing().is_filed_in(src, id) => src.clone(),
                Some(src) => {
                    return Err(RepoError::invalid(format!("{id} is not filed in {src}")));
                }
                None => match s.filing().parent_count(id) {
                    1 => filing::single_parent(s, id)?.ok_or_else(|| {
                        RepoError::Runtime(format!("{id} lost its parent during move"))
                    })?,
                    0 => return Err(RepoError::invalid(format!("{id} is unfiled"))),
                    _ => {
                        return Err(RepoError::invalid(format!(
                            "{id} is multi-filed; a source folder is required"
                        )))
                    }
                },
            };
            if &source == target {
                return Ok(());
            }
            if base == BaseType::Folder && filing::is_descendant_or_self(s, target, id) {
                return Err(RepoError::constraint(format!(
                    "cannot move folder {id} into itself or a descendant"
                )));
            }
            filing::check_placement(s, target, &type_id, &name, Some(id))?;

            filing::unfile_unit(s, &source, id);
            filing::file_unit(s, target, id);
            let entry = s.require_mut(id)?;
            if base == BaseType::Folder {
                entry.set_value(props::PARENT_ID, Some(Value::string(target.as_str())));
            }
            touch(entry, &self.principal);
            info!(id = %id, from = %source, to = %target, "moved object");
            Ok(())
        })
    }

    /// File a document or policy in an additional folder.
    pub fn add_object_to_folder(&self, id: &ObjectId, folder: &ObjectId) -> RepoResult<()> {
        self.inner.write(|s| {
            let entry = s.require(id)?;
            match entry.base_type() {
                BaseType::Folder => {
                    return Err(RepoError::constraint("folders cannot be multi-filed"));
                }
                BaseType::Relationship => {
                    return Err(RepoError::constraint("relationships are not fileable"));
                }
                BaseType::Document | BaseType::Policy => {}
            }
            if s.filing().is_filed_in(folder, id) {
                return Ok(());
            }
            let type_id = entry.type_id().to_string();
            let name = entry.name().unwrap_or_default().to_string();
            filing::check_placement(s, folder, &type_id, &name, Some(id))?;
            filing::file_unit(s, folder, id);
            info!(id = %id, folder = %folder, "filed object");
            Ok(())
        })
    }

    /// Remove an object from one folder. An object left without parents
    /// becomes unfiled.
    pub fn remove_object_from_folder(&self, id: &ObjectId, folder: &ObjectId) -> RepoResult<()> {
        self.inner.write(|s| {
            let base = s.require(id)?.base_type();
            if base == BaseType::Folder {
                return Err(RepoError::constraint(
                    "folders cannot be unfiled; move or delete them instead",
                ));
            }
            filing::require_folder(s, folder)?;
            if !s.filing().is_filed_in(folder, id) {
                return Err(RepoError::invalid(format!("{id} is not filed in {folder}")));
            }
            filing::unfile_unit(s, folder, id);
            info!(id = %id, folder = %folder, "unfiled object");
            Ok(())
        })
    }

    /// Listed children of a folder, sorted by name.
    pub fn children(&self, folder: &ObjectId) -> RepoResult<Vec<ObjectId>> {
        self.inner.read(|s| {
            filing::require_folder(s, folder)?;
            Ok(filing::listed_children(s, folder))
        })
    }

    /// Every folder `id` is filed in.
    pub fn parents(&self, id: &ObjectId) -> RepoResult<Vec<ObjectId>> {
        self.inner.read(|s| {
            self.check_has_parents(s, id)?;
            Ok(s.filing().parents(id).cloned().collect())
        })
    }

    /// The single folder `id` is filed in; `None` if unfiled. Multi-filed
    /// objects are a `Constraint` violation here.
    pub fn parent(&self, id: &ObjectId) -> RepoResult<Option<ObjectId>> {
        self.inner.read(|s| {
            self.check_has_parents(s, id)?;
            filing::single_parent(s, id)
        })
    }

    fn check_has_parents(&self, s: &folio_store::StoreState, id: &ObjectId) -> RepoResult<()> {
        if id == &self.inner.root_id {
            return Err(RepoError::constraint("the root folder has no parent"));
        }
        let base = s.require(id)?.base_type();
        if !base.is_fileable() {
            return Err(RepoError::constraint(format!("{base} objects are not fileable")));
        }
        Ok(())
    }

    pub fn folder_path(&self, folder: &ObjectId) -> RepoResult<String> {
        self.inner
            .read(|s| filing::folder_path(s, folder, &self.inner.root_id))
    }

    pub fn unfiled_objects(&self) -> RepoResult<Vec<ObjectId>> {
        self.inner
            .read(|s| Ok(s.filing().unfiled().cloned().collect()))
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    pub fn delete_object(&self, id: &ObjectId, all_versions: bool) -> RepoResult<()> {
        self.inner
            .write(|s| integrity::delete_object(s, id, all_versions, &self.inner.root_id))
    }

    /// Delete a folder and its contents. Returns the ids that could not be
    /// deleted.
    pub fn delete_tree(
        &self,
        folder: &ObjectId,
        all_versions: bool,
        continue_on_failure: bool,
    ) -> RepoResult<Vec<ObjectId>> {
        self.inner.write(|s| {
            integrity::delete_tree(
                s,
                folder,
                all_versions,
                continue_on_failure,
                &self.inner.root_id,
            )
        })
    }

    // -----------------------------------------------------------------------
    // Versioning
    // -----------------------------------------------------------------------

    /// Check out the series containing `id`, returning the new PWC id.
    pub fn checkout(&self, id: &ObjectId) -> RepoResult<ObjectId> {
        let definition = self.definition_of(id)?;
        if !definition.versionable {
            return Err(RepoError::constraint(format!(
                "type {} is not versionable",
                definition.id
            )));
        }
        self.inner
            .write(|s| versioning::checkout(s, id, &self.principal))
    }

    /// Check in the PWC `pwc`, applying the request's changes first.
    pub fn checkin(&self, pwc: &ObjectId, request: CheckinRequest) -> RepoResult<ObjectId> {
        let definition = self.definition_of(pwc)?;
        let acl_change = request.add_acl.is_some() || request.remove_acl.is_some();
        if acl_change && !definition.controllable_acl {
            return Err(RepoError::constraint(format!(
                "type {} is not ACL-controllable",
                definition.id
            )));
        }
        if !request.policies.is_empty() && !definition.controllable_policy {
            return Err(RepoError::constraint(format!(
                "type {} is not policy-controllable",
                definition.id
            )));
        }
        if request.content.is_some()
            && definition.content_stream_allowed == ContentStreamAllowed::NotAllowed
        {
            return Err(RepoError::constraint(format!(
                "type {} does not allow content",
                definition.id
            )));
        }

        self.inner.write(|s| {
            versioning::require_pwc(s, pwc)?;
            let current = s.require(pwc)?;
            let mut updated = current.clone();
            let ctx = WriteContext {
                is_new: false,
                is_pwc: true,
            };
            apply_updates(
                &mut updated,
                &definition.property_definitions,
                &request.properties,
                ctx,
            )?;
            if updated.name() != current.name() {
                if let Some(name) = updated.name() {
                    for parent in s.filing().parents(pwc) {
                        filing::check_unique_name(s, parent, name, Some(pwc))?;
                    }
                }
            }
            if let Some(content) = &request.content {
                s.check_content_replacement(pwc, Some(content))?;
                updated.set_content(Some(content.clone()));
            }
            if acl_change {
                let empty = Acl::new();
                let merged = updated.acl().merged(
                    request.add_acl.as_ref().unwrap_or(&empty),
                    request.remove_acl.as_ref().unwrap_or(&empty),
                );
                updated.set_acl(merged);
            }
            for policy in &request.policies {
                require_policy(s, policy)?;
                updated.add_policy(policy.clone());
            }
            touch(&mut updated, &self.principal);
            *s.require_mut(pwc)? = updated;
            for policy in &request.policies {
                s.policies_mut().apply(policy, pwc);
            }
            versioning::checkin(s, pwc, request.major, request.comment.as_deref())?;
            Ok(pwc.clone())
        })
    }

    pub fn cancel_checkout(&self, id: &ObjectId) -> RepoResult<()> {
        self.inner
            .write(|s| versioning::cancel_checkout(s, id))
    }

    /// Versions of a series: the PWC first, then newest first.
    pub fn all_versions(&self, series: &VersionSeriesId) -> RepoResult<Vec<ObjectId>> {
        self.inner.read(|s| versioning::all_versions(s, series))
    }

    /// Versions of the series containing document `id`.
    pub fn versions_of(&self, id: &ObjectId) -> RepoResult<Vec<ObjectId>> {
        self.inner.read(|s| {
            let series = versioning::series_id_of(s, id)?;
            versioning::all_versions(s, &series)
        })
    }

    pub fn latest_version(&self, id: &ObjectId) -> RepoResult<ObjectId> {
        self.inner.read(|s| latest_member(s, id))
    }

    pub fn is_private_working_copy(&self, id: &ObjectId) -> RepoResult<bool> {
        self.inner.read(|s| Ok(versioning::is_pwc(s, id)))
    }

    // -----------------------------------------------------------------------
    // ACL and policies
    // -----------------------------------------------------------------------

    pub fn acl(&self, id: &ObjectId) -> RepoResult<Acl> {
        self.require_controllable_acl(id)?;
        self.inner.read(|s| Ok(s.require(id)?.acl().clone()))
    }

    /// Merge `add` then `remove` into the ACL of `id`.
    pub fn apply_acl(&self, id: &ObjectId, add: &Acl, remove: &Acl) -> RepoResult<Acl> {
        self.require_controllable_acl(id)?;
        self.inner.write(|s| {
            let entry = s.require_mut(id)?;
            let merged = entry.acl().merged(add, remove);
            entry.set_acl(merged.clone());
            touch(entry, &self.principal);
            info!(id = %id, principals = merged.len(), "applied ACL");
            Ok(merged)
        })
    }

    fn require_controllable_acl(&self, id: &ObjectId) -> RepoResult<()> {
        let definition = self.definition_of(id)?;
        if !definition.controllable_acl {
            return Err(RepoError::constraint(format!(
                "type {} is not ACL-controllable",
                definition.id
            )));
        }
        Ok(())
    }

    fn require_controllable_policy(&self, id: &ObjectId) -> RepoResult<()> {
        let definition = self.definition_of(id)?;
        if !definition.controllable_policy {
            return Err(RepoError::constraint(format!(
                "type {} is not policy-controllable",
                definition.id
            )));
        }
        Ok(())
    }

    pub fn apply_policy(&self, policy: &ObjectId, object: &ObjectId) -> RepoResult<()> {
        self.require_controllable_policy(object)?;
        self.inner.write(|s| {
            require_policy(s, policy)?;
            let entry = s.require_mut(object)?;
            if !entry.add_policy(policy.clone()) {
                return Ok(());
            }
            touch(entry, &self.principal);
            s.policies_mut().apply(policy, object);
            info!(policy = %policy, object = %object, "applied policy");
            Ok(())
        })
    }

    pub fn remove_policy(&self, policy: &ObjectId, object: &ObjectId) -> RepoResult<()> {
        self.require_controllable_policy(object)?;
        self.inner.write(|s| {
            let entry = s.require_mut(object)?;
            if !entry.remove_policy(policy) {
                debug!(policy = %policy, object = %object, "policy was not applied");
                return Ok(());
            }
            touch(entry, &self.principal);
            s.policies_mut().remove(policy, object);
            info!(policy = %policy, object = %object, "removed policy");
            Ok(())
        })
    }

    pub fn applied_policies(&self, id: &ObjectId) -> RepoResult<Vec<ObjectId>> {
        self.inner
            .read(|s| Ok(s.require(id)?.policies().iter().cloned().collect()))
    }

    pub fn policy_targets(&self, policy: &ObjectId) -> RepoResult<Vec<ObjectId>> {
        self.inner.read(|s| {
            require_policy(s, policy)?;
            Ok(s.policies().targets(policy).cloned().collect())
        })
    }

    // -----------------------------------------------------------------------
    // Relationships
    // -----------------------------------------------------------------------

    /// Relationships touching `id` from `direction`, optionally restricted
    /// to `type_id` (and its subtypes when `include_subtypes` is set).
    pub fn relationships(
        &self,
        id: &ObjectId,
        direction: RelationshipDirection,
        type_id: Option<&str>,
        include_subtypes: bool,
    ) -> RepoResult<Vec<ObjectId>> {
        let candidates: Vec<(ObjectId, String)> = self.inner.read(|s| {
            s.require(id)?;
            let mut ids: Vec<&ObjectId> = Vec::new();
            if direction.includes_source() {
                ids.extend(s.edges().outgoing(id));
            }
            if direction.includes_target() {
                ids.extend(s.edges().incoming(id));
            }
            ids.sort();
            ids.dedup();
            Ok(ids
                .into_iter()
                .filter_map(|r| s.entry(r).map(|e| (r.clone(), e.type_id().to_string())))
                .collect())
        })?;

        let mut out = Vec::with_capacity(candidates.len());
        for (rel, rel_type) in candidates {
            let keep = match type_id {
                None => true,
                Some(wanted) if rel_type == wanted => true,
                Some(wanted) if include_subtypes => {
                    self.inner.types.is_subtype_of(&rel_type, wanted)?
                }
                Some(_) => false,
            };
            if keep {
                out.push(rel);
            }
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------------

    pub fn add_type(&self, definition: TypeDefinition) -> RepoResult<()> {
        Ok(self.inner.types.add_type(definition)?)
    }

    pub fn type_definition(&self, id: &str, include_properties: bool) -> RepoResult<TypeDefinition> {
        Ok(self.inner.types.type_definition(id, include_properties)?)
    }

    /// Direct subtypes of `id`, or the base types for `None`.
    pub fn type_children(
        &self,
        id: Option<&str>,
        include_properties: bool,
    ) -> RepoResult<Vec<TypeDefinition>> {
        Ok(self.inner.types.type_children(id, include_properties)?)
    }

    pub fn type_descendants(
        &self,
        id: Option<&str>,
        depth: Option<usize>,
        include_properties: bool,
    ) -> RepoResult<Vec<TypeTree>> {
        Ok(self
            .inner
            .types
            .type_descendants(id, depth, include_properties)?)
    }

    /// Remove a custom type. Base types, types with subtypes, and types
    /// with stored instances are refused.
    pub fn remove_type(&self, id: &str) -> RepoResult<TypeDefinition> {
        let definition = self.inner.types.type_definition(id, false)?;
        if definition.is_base() {
            return Err(RepoError::constraint(format!("{id} is a base type")));
        }
        if !self.inner.types.type_children(Some(id), false)?.is_empty() {
            return Err(RepoError::constraint(format!("type {id} has subtypes")));
        }
        let in_use = self
            .inner
            .read(|s| Ok(s.entries().any(|e| e.type_id() == id)))?;
        if in_use {
            return Err(RepoError::constraint(format!(
                "type {id} still has stored objects"
            )));
        }
        Ok(self.inner.types.remove_type(id)?)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("repository", &self.inner.config.repository_id)
            .field("principal", &self.principal)
            .finish()
    }
}

fn require_document(base: BaseType, id: &ObjectId) -> RepoResult<()> {
    if base != BaseType::Document {
        return Err(RepoError::constraint(format!(
            "{id} is a {base}; only documents carry content"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use folio_types::{Permission, PropertyDefinition, PropertyType};

    use crate::config::RepositoryConfig;
    use crate::create::NewObject;
    use crate::error::ErrorKind;
    use crate::repository::Repository;
    use crate::versioning::VersioningState;

    fn setup() -> (Repository, Connection, ObjectId) {
        let repo = Repository::new(RepositoryConfig::default()).unwrap();
        let conn = repo.connect("alice");
        let root = repo.root_folder_id().clone();
        (repo, conn, root)
    }

    fn text(body: &'static str) -> ContentStream {
        ContentStream::new("text/plain", body)
    }

    fn names(conn: &Connection, ids: &[ObjectId]) -> Vec<String> {
        ids.iter()
            .map(|id| {
                conn.properties(id).unwrap()[props::NAME]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Versioning
    // -----------------------------------------------------------------------

    #[test]
    fn checkout_then_checkin_lists_only_the_new_version() {
        let (_repo, conn, root) = setup();
        let docs = conn.create_folder(&root, "Docs").unwrap();
        let docs_id = docs.require_id().unwrap().clone();
        let a = docs.create_document("a.txt", Some(text("one"))).unwrap();
        assert_eq!(a.version_label().unwrap().as_deref(), Some("1.0"));

        let pwc = a.checkout().unwrap();
        assert!(pwc.is_pwc().unwrap());
        assert!(a.is_version_series_checked_out().unwrap());
        assert_eq!(a.checked_out_by().unwrap().as_deref(), Some("alice"));
        // The checked-in version stays listed while the PWC is open.
        assert_eq!(conn.children(&docs_id).unwrap(), vec![a.require_id().unwrap().clone()]);

        let new_id = pwc
            .checkin(CheckinRequest::major().comment("v2").content(text("two")))
            .unwrap();
        let latest = conn.document(&new_id).unwrap();
        assert_eq!(latest.version_label().unwrap().as_deref(), Some("2.0"));
        assert_eq!(latest.checkin_comment().unwrap().as_deref(), Some("v2"));
        assert!(latest.is_latest_version().unwrap());
        assert!(!latest.is_pwc().unwrap());
        assert!(!a.is_latest_version().unwrap());
        assert!(!a.is_version_series_checked_out().unwrap());
        assert_eq!(conn.children(&docs_id).unwrap(), vec![new_id.clone()]);

        let versions = conn.versions_of(a.require_id().unwrap()).unwrap();
        assert_eq!(versions, vec![new_id.clone(), a.require_id().unwrap().clone()]);
        assert_eq!(conn.latest_version(a.require_id().unwrap()).unwrap(), new_id);
        let body = latest.content_stream().unwrap().unwrap();
        assert_eq!(body.len(), 3);
    }

    #[test]
    fn minor_checkin_bumps_minor_label() {
        let (_repo, conn, root) = setup();
        let doc = conn.create_document(&root, "notes", None).unwrap();
        let pwc = doc.checkout().unwrap();
        let id = pwc.checkin(CheckinRequest::minor()).unwrap();
        let v = conn.document(&id).unwrap();
        assert_eq!(v.version_label().unwrap().as_deref(), Some("1.1"));
        assert!(!v.is_major_version().unwrap());
        assert!(doc.is_latest_major_version().unwrap());
    }

    #[test]
    fn concurrent_checkout_admits_exactly_one() {
        let (repo, conn, root) = setup();
        let doc = conn.create_document(&root, "shared", None).unwrap();
        let id = doc.require_id().unwrap().clone();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let conn = repo.connect(format!("user-{i}"));
                let id = id.clone();
                thread::spawn(move || conn.checkout(&id))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let won = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(won, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.kind() == ErrorKind::Versioning));
    }

    #[test]
    fn cancel_checkout_restores_previous_state() {
        let (repo, conn, root) = setup();
        let doc = conn.create_document(&root, "draft", Some(text("body"))).unwrap();
        let id = doc.require_id().unwrap().clone();
        let before = conn.properties(&id).unwrap();
        let info_before = repo.info().unwrap();

        let pwc = conn.checkout(&id).unwrap();
        assert_eq!(conn.versions_of(&id).unwrap().len(), 2);
        conn.cancel_checkout(&pwc).unwrap();

        assert_eq!(conn.properties(&id).unwrap(), before);
        assert_eq!(repo.info().unwrap(), info_before);
        assert!(conn.object(&pwc).is_err());
        assert_eq!(conn.children(&root).unwrap(), vec![id]);
    }

    #[test]
    fn cancel_checkout_keeps_relationship_endpoints() {
        let (_repo, conn, root) = setup();
        let a = conn.create_document(&root, "a", None).unwrap();
        let a_id = a.require_id().unwrap().clone();
        let b = conn.create_document(&root, "b", None).unwrap();
        let b_id = b.require_id().unwrap().clone();
        let pwc = conn.checkout(&a_id).unwrap();
        let rel = conn
            .create_relationship("cmis:relationship", "r", &pwc, &b_id)
            .unwrap();

        let err = conn.cancel_checkout(&a_id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);
        assert!(conn.object(&pwc).is_ok());

        conn.delete_object(rel.require_id().unwrap(), false).unwrap();
        conn.cancel_checkout(&a_id).unwrap();
        assert!(conn.object(&pwc).is_err());
    }

    #[test]
    fn deleting_a_pwc_keeps_the_checked_in_versions() {
        let (_repo, conn, root) = setup();
        let doc = conn.create_document(&root, "d", Some(text("v1"))).unwrap();
        let id = doc.require_id().unwrap().clone();
        let pwc = conn.checkout(&id).unwrap();

        conn.delete_object(&pwc, true).unwrap();
        assert!(conn.object(&pwc).is_err());
        assert!(conn.document(&id).unwrap().is_latest_version().unwrap());
        assert_eq!(conn.versions_of(&id).unwrap(), vec![id.clone()]);
        assert_eq!(conn.children(&root).unwrap(), vec![id]);
    }

    #[test]
    fn delete_tree_over_a_checked_out_document() {
        let (repo, conn, root) = setup();
        let folder = conn.root_folder().unwrap().create_folder("F").unwrap();
        let folder_id = folder.require_id().unwrap().clone();
        let doc = folder.create_document("d", None).unwrap();
        conn.checkout(doc.require_id().unwrap()).unwrap();

        let failed = conn.delete_tree(&folder_id, false, true).unwrap();
        assert!(failed.is_empty());
        assert!(conn.children(&root).unwrap().is_empty());
        assert_eq!(repo.info().unwrap().objects, 1);
    }

    #[test]
    fn checkout_shares_content_with_its_source() {
        let config = RepositoryConfig {
            max_content_bytes: Some(4),
            ..RepositoryConfig::default()
        };
        let repo = Repository::new(config).unwrap();
        let conn = repo.connect("alice");
        let root = repo.root_folder_id().clone();
        let doc = conn.create_document(&root, "d", Some(text("abcd"))).unwrap();

        let pwc = conn.checkout(doc.require_id().unwrap()).unwrap();
        assert_eq!(repo.info().unwrap().content_bytes, 4);
        conn.document(&pwc)
            .unwrap()
            .checkin(CheckinRequest::major())
            .unwrap();
        assert_eq!(repo.info().unwrap().content_bytes, 4);
    }

    #[test]
    fn checkin_of_a_checked_in_version_is_rejected() {
        let (_repo, conn, root) = setup();
        let doc = conn.create_document(&root, "d", None).unwrap();
        let err = doc.checkin(CheckinRequest::major()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);
    }

    #[test]
    fn checkout_of_non_versionable_type_is_rejected() {
        let (_repo, conn, root) = setup();
        conn.add_type(TypeDefinition::derived("acme:memo", BaseType::Document, "cmis:document"))
            .unwrap();
        let id = conn
            .create_object(NewObject::new("acme:memo", "m").in_folder(&root))
            .unwrap();
        assert_eq!(conn.checkout(&id).unwrap_err().kind(), ErrorKind::Constraint);
    }

    #[test]
    fn created_checked_out_then_cancelled_disappears() {
        let (repo, conn, root) = setup();
        let id = conn
            .create_object(
                NewObject::new("cmis:document", "pending")
                    .in_folder(&root)
                    .versioning(VersioningState::CheckedOut),
            )
            .unwrap();
        assert!(conn.is_private_working_copy(&id).unwrap());
        // A series with nothing checked in lists its PWC.
        assert_eq!(conn.children(&root).unwrap(), vec![id.clone()]);

        conn.cancel_checkout(&id).unwrap();
        assert!(matches!(conn.object(&id), Err(RepoError::ObjectNotFound(_))));
        assert!(conn.children(&root).unwrap().is_empty());
        assert_eq!(repo.info().unwrap().version_series, 0);
    }

    #[test]
    fn checkin_applies_properties_acl_and_policies() {
        let (_repo, conn, root) = setup();
        let policy = conn.create_policy(Some(&root), "retention", "keep").unwrap();
        let policy_id = policy.require_id().unwrap().clone();
        let doc = conn.create_document(&root, "report", None).unwrap();
        let pwc = doc.checkout().unwrap();

        let request = CheckinRequest::major()
            .properties(Properties::new().with(props::NAME, "report-final"))
            .acl(Acl::new().grant("bob", [Permission::Read]), Acl::new())
            .policy(policy_id.clone());
        let id = pwc.checkin(request).unwrap();

        let v = conn.document(&id).unwrap();
        assert_eq!(v.name().unwrap().as_deref(), Some("report-final"));
        assert!(conn.acl(&id).unwrap().allows("bob", Permission::Read));
        assert_eq!(conn.applied_policies(&id).unwrap(), vec![policy_id.clone()]);
        assert!(conn.policy_targets(&policy_id).unwrap().contains(&id));
    }

    // -----------------------------------------------------------------------
    // Properties and content
    // -----------------------------------------------------------------------

    #[test]
    fn rejected_update_leaves_object_unchanged() {
        let (_repo, conn, root) = setup();
        let doc = conn.create_document(&root, "keep", None).unwrap();
        let id = doc.require_id().unwrap().clone();
        let before = conn.properties(&id).unwrap();

        let updates = Properties::new()
            .with(props::NAME, "renamed")
            .with("acme:undefined", "x");
        let err = conn.update_properties(&id, &updates, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);
        assert_eq!(conn.properties(&id).unwrap(), before);

        let err = conn
            .update_properties(&id, &Properties::new().with(props::NAME, ""), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameConstraintViolation);
    }

    #[test]
    fn update_changes_token_and_modifier() {
        let (repo, conn, root) = setup();
        let doc = conn.create_document(&root, "a", None).unwrap();
        let id = doc.require_id().unwrap().clone();
        let token = doc.change_token().unwrap();

        let bob = repo.connect("bob");
        bob.update_properties(&id, &Properties::new().with(props::NAME, "b"), token.as_deref())
            .unwrap();
        let props_after = conn.properties(&id).unwrap();
        assert_eq!(props_after[props::LAST_MODIFIED_BY].as_str(), Some("bob"));
        assert_eq!(props_after[props::CREATED_BY].as_str(), Some("alice"));
        assert_ne!(doc.change_token().unwrap(), token);
    }

    #[test]
    fn stale_change_token_conflicts() {
        let config = RepositoryConfig {
            enforce_change_tokens: true,
            ..Default::default()
        };
        let repo = Repository::new(config).unwrap();
        let conn = repo.connect("alice");
        let root = repo.root_folder_id().clone();
        let doc = conn.create_document(&root, "a", None).unwrap();
        let id = doc.require_id().unwrap().clone();
        let stale = doc.change_token().unwrap();

        conn.update_properties(&id, &Properties::new().with(props::NAME, "b"), stale.as_deref())
            .unwrap();
        let err = conn
            .update_properties(&id, &Properties::new().with(props::NAME, "c"), stale.as_deref())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpdateConflict);

        let err = conn
            .update_properties(&id, &Properties::new().with(props::NAME, "c"), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn read_only_writes_are_ignored() {
        let (_repo, conn, root) = setup();
        let doc = conn.create_document(&root, "a", None).unwrap();
        let id = doc.require_id().unwrap().clone();
        conn.update_properties(
            &id,
            &Properties::new().with(props::VERSION_LABEL, "9.9"),
            None,
        )
        .unwrap();
        assert_eq!(doc.version_label().unwrap().as_deref(), Some("1.0"));
    }

    #[test]
    fn content_overwrite_requires_flag() {
        let (repo, conn, root) = setup();
        let doc = conn.create_document(&root, "a", Some(text("abc"))).unwrap();
        let id = doc.require_id().unwrap().clone();

        let err = conn.set_content_stream(&id, text("xyz!"), false, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);
        conn.set_content_stream(&id, text("xyz!"), true, None).unwrap();
        assert_eq!(repo.info().unwrap().content_bytes, 4);

        conn.delete_content_stream(&id, None).unwrap();
        assert!(conn.content_stream(&id).unwrap().is_none());
        assert_eq!(repo.info().unwrap().content_bytes, 0);
    }

    #[test]
    fn required_content_cannot_be_deleted() {
        let (_repo, conn, root) = setup();
        conn.add_type(
            TypeDefinition::derived("acme:scan", BaseType::Document, "cmis:document")
                .content_stream(ContentStreamAllowed::Required),
        )
        .unwrap();
        let err = conn
            .create_object(NewObject::new("acme:scan", "empty").in_folder(&root))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);

        let id = conn
            .create_object(
                NewObject::new("acme:scan", "page")
                    .in_folder(&root)
                    .content(text("img")),
            )
            .unwrap();
        let err = conn.delete_content_stream(&id, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);
    }

    #[test]
    fn folders_report_their_path() {
        let (_repo, conn, root) = setup();
        let a = conn.create_folder(&root, "A").unwrap();
        let b = a.create_folder("B").unwrap();
        let b_id = b.require_id().unwrap();
        let props_b = conn.properties(b_id).unwrap();
        assert_eq!(props_b[props::PATH].as_str(), Some("/A/B"));
        assert_eq!(props_b[props::PARENT_ID].as_str(), Some(a.require_id().unwrap().as_str()));
    }

    // -----------------------------------------------------------------------
    // Filing
    // -----------------------------------------------------------------------

    #[test]
    fn sibling_names_must_be_unique() {
        let (_repo, conn, root) = setup();
        conn.create_document(&root, "dup", None).unwrap();
        let err = conn.create_document(&root, "dup", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameConstraintViolation);

        let other = conn.create_document(&root, "other", None).unwrap();
        let err = conn
            .update_properties(
                other.require_id().unwrap(),
                &Properties::new().with(props::NAME, "dup"),
                None,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameConstraintViolation);

        let sub = conn.create_folder(&root, "sub").unwrap();
        let twin = sub.create_document("dup", None).unwrap();
        let err = conn
            .move_object(twin.require_id().unwrap(), &root, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameConstraintViolation);
    }

    #[test]
    fn allowed_child_types_are_enforced() {
        let (_repo, conn, root) = setup();
        let id = conn
            .create_object(
                NewObject::new("cmis:folder", "Invoices")
                    .in_folder(&root)
                    .property(
                        props::ALLOWED_CHILD_OBJECT_TYPE_IDS,
                        Value::strings(["cmis:document"]),
                    ),
            )
            .unwrap();
        let invoices = conn.folder(&id).unwrap();
        assert_eq!(invoices.allowed_child_types().unwrap(), vec!["cmis:document"]);

        invoices.create_document("inv-1", None).unwrap();
        let err = invoices.create_folder("nested").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);
    }

    #[test]
    fn moving_a_folder_below_itself_is_rejected() {
        let (_repo, conn, root) = setup();
        let a = conn.create_folder(&root, "A").unwrap();
        let b = a.create_folder("B").unwrap();
        let a_id = a.require_id().unwrap();
        let b_id = b.require_id().unwrap();

        for target in [a_id, b_id] {
            let err = conn.move_object(a_id, target, None).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Constraint);
        }
        let err = conn.move_object(&root, b_id, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);
    }

    #[test]
    fn move_refiles_every_version() {
        let (_repo, conn, root) = setup();
        let dest = conn.create_folder(&root, "dest").unwrap();
        let dest_id = dest.require_id().unwrap().clone();
        let doc = conn.create_document(&root, "moving", None).unwrap();
        let id = doc.require_id().unwrap().clone();
        let pwc = conn.checkout(&id).unwrap();

        conn.move_object(&id, &dest_id, Some(&root)).unwrap();
        assert_eq!(conn.parents(&id).unwrap(), vec![dest_id.clone()]);
        assert_eq!(conn.parents(&pwc).unwrap(), vec![dest_id.clone()]);
        assert_eq!(conn.children(&dest_id).unwrap(), vec![id]);
        assert_eq!(names(&conn, &conn.children(&root).unwrap()), vec!["dest"]);
    }

    #[test]
    fn move_with_wrong_source_is_invalid() {
        let (_repo, conn, root) = setup();
        let a = conn.create_folder(&root, "A").unwrap();
        let b = conn.create_folder(&root, "B").unwrap();
        let doc = conn.create_document(&root, "d", None).unwrap();
        let err = conn
            .move_object(doc.require_id().unwrap(), b.require_id().unwrap(), a.id())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn multi_filing_and_unfiling() {
        let (_repo, conn, root) = setup();
        let other = conn.create_folder(&root, "other").unwrap();
        let other_id = other.require_id().unwrap().clone();
        let doc = conn.create_document(&root, "shared", None).unwrap();
        let id = doc.require_id().unwrap().clone();

        other.add_object(&doc).unwrap();
        other.add_object(&doc).unwrap();
        let mut parents = conn.parents(&id).unwrap();
        parents.sort();
        let mut expected = vec![root.clone(), other_id.clone()];
        expected.sort();
        assert_eq!(parents, expected);
        assert_eq!(conn.parent(&id).unwrap_err().kind(), ErrorKind::Constraint);

        // Moving a multi-filed object needs an explicit source.
        let err = conn.move_object(&id, &other_id, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        conn.remove_object_from_folder(&id, &root).unwrap();
        assert_eq!(conn.parent(&id).unwrap(), Some(other_id.clone()));
        conn.remove_object_from_folder(&id, &other_id).unwrap();
        assert_eq!(conn.unfiled_objects().unwrap(), vec![id.clone()]);
        assert_eq!(conn.parent(&id).unwrap(), None);

        let err = conn.remove_object_from_folder(&id, &other_id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn folders_cannot_be_multi_filed() {
        let (_repo, conn, root) = setup();
        let a = conn.create_folder(&root, "A").unwrap();
        let b = conn.create_folder(&root, "B").unwrap();
        let err = b.add_object(&a).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);
    }

    #[test]
    fn root_has_no_parent() {
        let (_repo, conn, root) = setup();
        assert_eq!(conn.parents(&root).unwrap_err().kind(), ErrorKind::Constraint);
        assert_eq!(conn.parent(&root).unwrap_err().kind(), ErrorKind::Constraint);
    }

    #[test]
    fn objects_resolve_by_path() {
        let (_repo, conn, root) = setup();
        let a = conn.create_folder(&root, "A").unwrap();
        let doc = a.create_document("file.txt", None).unwrap();

        let found = conn.object_by_path("/A/file.txt").unwrap();
        assert_eq!(found.id(), doc.id());
        assert_eq!(conn.object_by_path("/").unwrap().id(), Some(&root));
        assert_eq!(
            conn.object_by_path("/A/missing").unwrap_err().kind(),
            ErrorKind::ObjectNotFound
        );
        assert_eq!(
            conn.object_by_path("A").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn copy_creates_an_independent_document() {
        let (_repo, conn, root) = setup();
        let dest = conn.create_folder(&root, "dest").unwrap();
        let dest_id = dest.require_id().unwrap().clone();
        let doc = conn.create_document(&root, "orig", Some(text("data"))).unwrap();
        let id = doc.require_id().unwrap().clone();

        let copy = conn
            .copy_document(&id, &dest_id, Properties::new().with(props::NAME, "copy"), None)
            .unwrap();
        let copy_doc = conn.document(&copy).unwrap();
        assert_eq!(copy_doc.name().unwrap().as_deref(), Some("copy"));
        assert_eq!(copy_doc.content_stream().unwrap().unwrap().len(), 4);
        assert_ne!(copy_doc.version_series_id().unwrap(), doc.version_series_id().unwrap());
        assert_eq!(conn.parents(&copy).unwrap(), vec![dest_id]);

        let err = conn
            .copy_document(&id, &root, Properties::new(), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameConstraintViolation);
    }

    // -----------------------------------------------------------------------
    // Integrity
    // -----------------------------------------------------------------------

    #[test]
    fn non_empty_folder_cannot_be_deleted() {
        let (_repo, conn, root) = setup();
        let folder = conn.create_folder(&root, "full").unwrap();
        let doc = folder.create_document("x", None).unwrap();

        let err = folder.delete(false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);
        doc.delete(true).unwrap();
        folder.delete(false).unwrap();
        assert!(conn.children(&root).unwrap().is_empty());
        assert_eq!(
            conn.delete_object(&root, false).unwrap_err().kind(),
            ErrorKind::Constraint
        );
    }

    #[test]
    fn delete_tree_removes_everything_below() {
        let (repo, conn, root) = setup();
        let top = conn.create_folder(&root, "top").unwrap();
        let mid = top.create_folder("mid").unwrap();
        mid.create_document("leaf", Some(text("x"))).unwrap();
        top.create_document("doc", None).unwrap();

        let failed = top.delete_tree(true, false).unwrap();
        assert!(failed.is_empty());
        assert_eq!(repo.info().unwrap().objects, 1);
    }

    #[test]
    fn relationship_endpoints_are_protected() {
        let (_repo, conn, root) = setup();
        conn.add_type(TypeDefinition::derived(
            "acme:cites",
            BaseType::Relationship,
            "cmis:relationship",
        ))
        .unwrap();
        let a = conn.create_document(&root, "a", None).unwrap();
        let b = conn.create_document(&root, "b", None).unwrap();
        let a_id = a.require_id().unwrap().clone();
        let b_id = b.require_id().unwrap().clone();

        let plain = conn.create_relationship("cmis:relationship", "r1", &a_id, &b_id).unwrap();
        let cites = conn.create_relationship("acme:cites", "r2", &b_id, &a_id).unwrap();
        let plain_id = plain.require_id().unwrap().clone();
        let cites_id = cites.require_id().unwrap().clone();
        assert_eq!(plain.source_id().unwrap(), a_id);
        assert_eq!(plain.target().unwrap().id(), Some(&b_id));

        assert_eq!(
            conn.relationships(&a_id, RelationshipDirection::Source, None, false).unwrap(),
            vec![plain_id.clone()]
        );
        let mut either = conn
            .relationships(&a_id, RelationshipDirection::Either, None, false)
            .unwrap();
        either.sort();
        let mut expected = vec![plain_id.clone(), cites_id.clone()];
        expected.sort();
        assert_eq!(either, expected);
        assert_eq!(
            conn.relationships(&a_id, RelationshipDirection::Either, Some("cmis:relationship"), false)
                .unwrap(),
            vec![plain_id.clone()]
        );
        assert_eq!(
            conn.relationships(&a_id, RelationshipDirection::Either, Some("cmis:relationship"), true)
                .unwrap()
                .len(),
            2
        );

        let err = conn.delete_object(&a_id, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);
        conn.delete_object(&plain_id, false).unwrap();
        conn.delete_object(&cites_id, false).unwrap();
        conn.delete_object(&a_id, true).unwrap();
    }

    #[test]
    fn relationships_cannot_target_relationships() {
        let (_repo, conn, root) = setup();
        let a = conn.create_document(&root, "a", None).unwrap();
        let b = conn.create_document(&root, "b", None).unwrap();
        let a_id = a.require_id().unwrap().clone();
        let rel = conn
            .create_relationship("cmis:relationship", "r", &a_id, b.require_id().unwrap())
            .unwrap();
        let err = conn
            .create_relationship("cmis:relationship", "rr", &a_id, rel.require_id().unwrap())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);
    }

    // -----------------------------------------------------------------------
    // ACL and policies
    // -----------------------------------------------------------------------

    #[test]
    fn acl_adds_before_removing() {
        let (_repo, conn, root) = setup();
        let doc = conn.create_document(&root, "secured", None).unwrap();
        let id = doc.require_id().unwrap().clone();

        let add = Acl::new().grant("bob", [Permission::Read, Permission::Write]);
        let acl = conn.apply_acl(&id, &add, &Acl::new()).unwrap();
        assert!(acl.allows("bob", Permission::Write));

        let remove = Acl::new().grant("bob", [Permission::Write]);
        let acl = conn.apply_acl(&id, &add, &remove).unwrap();
        assert!(acl.allows("bob", Permission::Read));
        assert!(!acl.allows("bob", Permission::Write));
        assert_eq!(conn.acl(&id).unwrap(), acl);
    }

    #[test]
    fn acl_on_uncontrollable_type_is_rejected() {
        let (_repo, conn, root) = setup();
        conn.add_type(TypeDefinition::derived("acme:memo", BaseType::Document, "cmis:document"))
            .unwrap();
        let id = conn
            .create_object(NewObject::new("acme:memo", "m").in_folder(&root))
            .unwrap();
        let add = Acl::new().grant("bob", [Permission::Read]);
        assert_eq!(
            conn.apply_acl(&id, &add, &Acl::new()).unwrap_err().kind(),
            ErrorKind::Constraint
        );
        assert_eq!(conn.acl(&id).unwrap_err().kind(), ErrorKind::Constraint);
    }

    #[test]
    fn applied_policy_blocks_its_deletion() {
        let (_repo, conn, root) = setup();
        let policy = conn.create_policy(None, "hold", "legal hold").unwrap();
        let policy_id = policy.require_id().unwrap().clone();
        let doc = conn.create_document(&root, "held", None).unwrap();
        doc.apply_policy(&policy).unwrap();
        doc.apply_policy(&policy).unwrap();
        assert_eq!(policy.targets().unwrap(), vec![doc.require_id().unwrap().clone()]);

        let err = conn.delete_object(&policy_id, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);

        doc.remove_policy(&policy).unwrap();
        doc.remove_policy(&policy).unwrap();
        assert!(doc.applied_policies().unwrap().is_empty());
        conn.delete_object(&policy_id, false).unwrap();
    }

    #[test]
    fn applying_a_non_policy_is_invalid() {
        let (_repo, conn, root) = setup();
        let a = conn.create_document(&root, "a", None).unwrap();
        let b = conn.create_document(&root, "b", None).unwrap();
        let err = conn
            .apply_policy(b.require_id().unwrap(), a.require_id().unwrap())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    // -----------------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------------

    #[test]
    fn remove_type_refuses_base_parent_and_used_types() {
        let (_repo, conn, root) = setup();
        assert_eq!(
            conn.remove_type("cmis:document").unwrap_err().kind(),
            ErrorKind::Constraint
        );

        conn.add_type(
            TypeDefinition::derived("acme:invoice", BaseType::Document, "cmis:document")
                .with_property(PropertyDefinition::new("acme:amount", PropertyType::Integer)),
        )
        .unwrap();
        conn.add_type(TypeDefinition::derived("acme:refund", BaseType::Document, "acme:invoice"))
            .unwrap();
        assert_eq!(
            conn.remove_type("acme:invoice").unwrap_err().kind(),
            ErrorKind::Constraint
        );

        let id = conn
            .create_object(
                NewObject::new("acme:refund", "r-1")
                    .in_folder(&root)
                    .property("acme:amount", 40_i64),
            )
            .unwrap();
        assert_eq!(
            conn.remove_type("acme:refund").unwrap_err().kind(),
            ErrorKind::Constraint
        );

        conn.delete_object(&id, true).unwrap();
        conn.remove_type("acme:refund").unwrap();
        conn.remove_type("acme:invoice").unwrap();
        assert_eq!(
            conn.type_definition("acme:invoice", false).unwrap_err().kind(),
            ErrorKind::TypeNotFound
        );
    }

    #[test]
    fn typed_property_values_are_checked() {
        let (_repo, conn, root) = setup();
        conn.add_type(
            TypeDefinition::derived("acme:invoice", BaseType::Document, "cmis:document")
                .with_property(PropertyDefinition::new("acme:amount", PropertyType::Integer)),
        )
        .unwrap();
        let err = conn
            .create_object(
                NewObject::new("acme:invoice", "bad")
                    .in_folder(&root)
                    .property("acme:amount", "forty"),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);
    }

    #[test]
    fn type_tree_is_browsable() {
        let (_repo, conn, _root) = setup();
        conn.add_type(TypeDefinition::derived("acme:memo", BaseType::Document, "cmis:document"))
            .unwrap();
        let bases = conn.type_children(None, false).unwrap();
        assert_eq!(bases.len(), 4);
        let docs = conn.type_descendants(Some("cmis:document"), None, false).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].definition.id, "acme:memo");
    }
}
