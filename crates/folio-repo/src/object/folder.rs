use folio_types::{props, ContentStream, ObjectId};

use super::{facade, CmisObject, Document, ObjectCore};
use crate::error::RepoResult;

/// A folder facade.
#[derive(Clone, Debug)]
pub struct Folder {
    core: ObjectCore,
}

facade!(Folder);

impl Folder {
    pub fn is_root(&self) -> bool {
        self.id() == Some(self.connection().root_folder_id())
    }

    /// Absolute path; the root is `/`.
    pub fn path(&self) -> RepoResult<String> {
        self.connection().folder_path(self.require_id()?)
    }

    /// Listed children sorted by name. Superseded document versions are
    /// not listed.
    pub fn children(&self) -> RepoResult<Vec<CmisObject>> {
        let conn = self.connection();
        conn.children(self.require_id()?)?
            .iter()
            .map(|id| conn.object(id))
            .collect()
    }

    pub fn has_children(&self) -> RepoResult<bool> {
        Ok(!self.connection().children(self.require_id()?)?.is_empty())
    }

    /// Type ids this folder accepts. Empty means no restriction.
    pub fn allowed_child_types(&self) -> RepoResult<Vec<String>> {
        Ok(self
            .property(props::ALLOWED_CHILD_OBJECT_TYPE_IDS)?
            .and_then(|v| v.as_strings().map(<[String]>::to_vec))
            .unwrap_or_default())
    }

    /// File an existing object here as well (multi-filing).
    pub fn add_object(&self, object: &ObjectCore) -> RepoResult<()> {
        self.connection()
            .add_object_to_folder(object.require_id()?, self.require_id()?)
    }

    pub fn remove_object(&self, object: &ObjectCore) -> RepoResult<()> {
        self.connection()
            .remove_object_from_folder(object.require_id()?, self.require_id()?)
    }

    pub fn create_folder(&self, name: &str) -> RepoResult<Folder> {
        self.connection().create_folder(self.require_id()?, name)
    }

    pub fn create_document(
        &self,
        name: &str,
        content: Option<ContentStream>,
    ) -> RepoResult<Document> {
        self.connection()
            .create_document(self.require_id()?, name, content)
    }

    /// Delete this folder and everything below it. Returns the ids that
    /// could not be deleted.
    pub fn delete_tree(
        &self,
        all_versions: bool,
        continue_on_failure: bool,
    ) -> RepoResult<Vec<ObjectId>> {
        self.connection()
            .delete_tree(self.require_id()?, all_versions, continue_on_failure)
    }
}
