use folio_types::{props, Acl, ContentStream, ObjectId, VersionSeriesId};

use super::{facade, ObjectCore};
use crate::error::RepoResult;
use crate::properties::Properties;

/// Everything a checkin may change on the private working copy.
#[derive(Clone, Debug, Default)]
pub struct CheckinRequest {
    pub major: bool,
    pub comment: Option<String>,
    pub properties: Properties,
    pub content: Option<ContentStream>,
    pub add_acl: Option<Acl>,
    pub remove_acl: Option<Acl>,
    pub policies: Vec<ObjectId>,
}

impl CheckinRequest {
    pub fn major() -> Self {
        Self {
            major: true,
            ..Default::default()
        }
    }

    pub fn minor() -> Self {
        Self::default()
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn content(mut self, content: ContentStream) -> Self {
        self.content = Some(content);
        self
    }

    pub fn acl(mut self, add: Acl, remove: Acl) -> Self {
        self.add_acl = Some(add);
        self.remove_acl = Some(remove);
        self
    }

    pub fn policy(mut self, policy: ObjectId) -> Self {
        self.policies.push(policy);
        self
    }
}

/// A document facade.
#[derive(Clone, Debug)]
pub struct Document {
    core: ObjectCore,
}

facade!(Document);

impl Document {
    // ---- Version flags ----

    /// Whether this document is the private working copy of its series.
    pub fn is_pwc(&self) -> RepoResult<bool> {
        match self.id() {
            Some(id) => self.connection().is_private_working_copy(id),
            None => Ok(false),
        }
    }

    pub fn is_latest_version(&self) -> RepoResult<bool> {
        self.flag(props::IS_LATEST_VERSION)
    }

    pub fn is_major_version(&self) -> RepoResult<bool> {
        self.flag(props::IS_MAJOR_VERSION)
    }

    pub fn is_latest_major_version(&self) -> RepoResult<bool> {
        self.flag(props::IS_LATEST_MAJOR_VERSION)
    }

    pub fn is_version_series_checked_out(&self) -> RepoResult<bool> {
        self.flag(props::IS_VERSION_SERIES_CHECKED_OUT)
    }

    pub fn checked_out_by(&self) -> RepoResult<Option<String>> {
        self.string(props::VERSION_SERIES_CHECKED_OUT_BY)
    }

    pub fn version_label(&self) -> RepoResult<Option<String>> {
        self.string(props::VERSION_LABEL)
    }

    pub fn checkin_comment(&self) -> RepoResult<Option<String>> {
        self.string(props::CHECKIN_COMMENT)
    }

    pub fn version_series_id(&self) -> RepoResult<Option<VersionSeriesId>> {
        match self.string(props::VERSION_SERIES_ID)? {
            Some(s) => Ok(Some(VersionSeriesId::new(s)?)),
            None => Ok(None),
        }
    }

    // ---- Content ----

    pub fn content_stream(&self) -> RepoResult<Option<ContentStream>> {
        self.connection().content_stream(self.require_id()?)
    }

    /// Attach content. With `overwrite = false`, existing content is a
    /// `Constraint` violation.
    pub fn set_content_stream(&self, content: ContentStream, overwrite: bool) -> RepoResult<()> {
        self.connection()
            .set_content_stream(self.require_id()?, content, overwrite, None)
    }

    pub fn delete_content_stream(&self) -> RepoResult<()> {
        self.connection()
            .delete_content_stream(self.require_id()?, None)
    }

    // ---- Versioning ----

    /// Check the series out, returning the private working copy.
    pub fn checkout(&self) -> RepoResult<Document> {
        let conn = self.connection();
        let pwc = conn.checkout(self.require_id()?)?;
        conn.document(&pwc)
    }

    /// Check this private working copy in. The facade stays valid: the PWC
    /// becomes the new latest version under the same id.
    pub fn checkin(&self, request: CheckinRequest) -> RepoResult<ObjectId> {
        self.connection().checkin(self.require_id()?, request)
    }

    pub fn cancel_checkout(&self) -> RepoResult<()> {
        self.connection().cancel_checkout(self.require_id()?)
    }

    /// Every version of this document's series: the PWC first, then
    /// checked-in versions newest first.
    pub fn all_versions(&self) -> RepoResult<Vec<Document>> {
        let conn = self.connection();
        conn.versions_of(self.require_id()?)?
            .iter()
            .map(|id| conn.document(id))
            .collect()
    }

    /// The latest checked-in version of this document's series.
    pub fn latest_version(&self) -> RepoResult<Document> {
        let conn = self.connection();
        let latest = conn.latest_version(self.require_id()?)?;
        conn.document(&latest)
    }
}
