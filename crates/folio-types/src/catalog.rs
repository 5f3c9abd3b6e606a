//! The standard property catalog.
//!
//! Every object carries the common base properties; each base type adds its
//! own set. These ids are reserved: custom types may not redeclare them.
//! The catalog is constructed explicitly and handed to the type manager, so
//! tests and embedders can inject a different one.

use std::collections::BTreeMap;

use crate::property::{PropertyDefinition, Updatability};
use crate::typedef::BaseType;
use crate::value::PropertyType;

/// Well-known property ids.
pub mod props {
    pub const OBJECT_ID: &str = "cmis:objectId";
    pub const NAME: &str = "cmis:name";
    pub const BASE_TYPE_ID: &str = "cmis:baseTypeId";
    pub const OBJECT_TYPE_ID: &str = "cmis:objectTypeId";
    pub const CREATED_BY: &str = "cmis:createdBy";
    pub const CREATION_DATE: &str = "cmis:creationDate";
    pub const LAST_MODIFIED_BY: &str = "cmis:lastModifiedBy";
    pub const LAST_MODIFICATION_DATE: &str = "cmis:lastModificationDate";
    pub const CHANGE_TOKEN: &str = "cmis:changeToken";

    pub const IS_IMMUTABLE: &str = "cmis:isImmutable";
    pub const IS_LATEST_VERSION: &str = "cmis:isLatestVersion";
    pub const IS_MAJOR_VERSION: &str = "cmis:isMajorVersion";
    pub const IS_LATEST_MAJOR_VERSION: &str = "cmis:isLatestMajorVersion";
    pub const VERSION_LABEL: &str = "cmis:versionLabel";
    pub const VERSION_SERIES_ID: &str = "cmis:versionSeriesId";
    pub const IS_VERSION_SERIES_CHECKED_OUT: &str = "cmis:isVersionSeriesCheckedOut";
    pub const VERSION_SERIES_CHECKED_OUT_BY: &str = "cmis:versionSeriesCheckedOutBy";
    pub const VERSION_SERIES_CHECKED_OUT_ID: &str = "cmis:versionSeriesCheckedOutId";
    pub const CHECKIN_COMMENT: &str = "cmis:checkinComment";
    pub const CONTENT_STREAM_LENGTH: &str = "cmis:contentStreamLength";
    pub const CONTENT_STREAM_MIME_TYPE: &str = "cmis:contentStreamMimeType";
    pub const CONTENT_STREAM_FILE_NAME: &str = "cmis:contentStreamFileName";
    pub const CONTENT_STREAM_ID: &str = "cmis:contentStreamId";

    pub const PARENT_ID: &str = "cmis:parentId";
    pub const ALLOWED_CHILD_OBJECT_TYPE_IDS: &str = "cmis:allowedChildObjectTypeIds";
    pub const PATH: &str = "cmis:path";

    pub const SOURCE_ID: &str = "cmis:sourceId";
    pub const TARGET_ID: &str = "cmis:targetId";

    pub const POLICY_TEXT: &str = "cmis:policyText";
}

/// Property definitions shared by all objects of a base type.
#[derive(Clone, Debug)]
pub struct PropertyCatalog {
    common: BTreeMap<String, PropertyDefinition>,
    by_base: BTreeMap<BaseType, BTreeMap<String, PropertyDefinition>>,
}

impl PropertyCatalog {
    /// A catalog with no definitions at all.
    pub fn empty() -> Self {
        Self {
            common: BTreeMap::new(),
            by_base: BTreeMap::new(),
        }
    }

    /// The standard CMIS 1.0 base property set.
    pub fn standard() -> Self {
        use PropertyType::{Boolean, Date, Integer, String};
        use Updatability::{OnCreate, ReadOnly, ReadWrite};

        let ro = |id: &str, t| PropertyDefinition::new(id, t).updatability(ReadOnly);

        let mut catalog = Self::empty();
        for def in [
            ro(props::OBJECT_ID, String),
            PropertyDefinition::new(props::NAME, String)
                .updatability(ReadWrite)
                .required(),
            ro(props::BASE_TYPE_ID, String),
            PropertyDefinition::new(props::OBJECT_TYPE_ID, String)
                .updatability(OnCreate)
                .required(),
            ro(props::CREATED_BY, String),
            ro(props::CREATION_DATE, Date),
            ro(props::LAST_MODIFIED_BY, String),
            ro(props::LAST_MODIFICATION_DATE, Date),
            ro(props::CHANGE_TOKEN, String),
        ] {
            catalog.common.insert(def.id.clone(), def);
        }

        catalog.insert_all(
            BaseType::Document,
            [
                ro(props::IS_IMMUTABLE, Boolean),
                ro(props::IS_LATEST_VERSION, Boolean),
                ro(props::IS_MAJOR_VERSION, Boolean),
                ro(props::IS_LATEST_MAJOR_VERSION, Boolean),
                ro(props::VERSION_LABEL, String),
                ro(props::VERSION_SERIES_ID, String),
                ro(props::IS_VERSION_SERIES_CHECKED_OUT, Boolean),
                ro(props::VERSION_SERIES_CHECKED_OUT_BY, String),
                ro(props::VERSION_SERIES_CHECKED_OUT_ID, String),
                ro(props::CHECKIN_COMMENT, String),
                ro(props::CONTENT_STREAM_LENGTH, Integer),
                ro(props::CONTENT_STREAM_MIME_TYPE, String),
                ro(props::CONTENT_STREAM_FILE_NAME, String),
                ro(props::CONTENT_STREAM_ID, String),
            ],
        );
        catalog.insert_all(
            BaseType::Folder,
            [
                ro(props::PARENT_ID, String),
                PropertyDefinition::new(props::ALLOWED_CHILD_OBJECT_TYPE_IDS, String)
                    .multi()
                    .updatability(OnCreate),
                ro(props::PATH, String),
            ],
        );
        catalog.insert_all(
            BaseType::Relationship,
            [
                PropertyDefinition::new(props::SOURCE_ID, String)
                    .updatability(OnCreate)
                    .required(),
                PropertyDefinition::new(props::TARGET_ID, String)
                    .updatability(OnCreate)
                    .required(),
            ],
        );
        catalog.insert_all(
            BaseType::Policy,
            [PropertyDefinition::new(props::POLICY_TEXT, String)],
        );
        catalog
    }

    fn insert_all<I>(&mut self, base: BaseType, defs: I)
    where
        I: IntoIterator<Item = PropertyDefinition>,
    {
        let map = self.by_base.entry(base).or_default();
        for def in defs {
            map.insert(def.id.clone(), def);
        }
    }

    /// Common plus base-specific definitions for `base`.
    pub fn definitions_for(&self, base: BaseType) -> impl Iterator<Item = &PropertyDefinition> {
        self.common
            .values()
            .chain(self.by_base.get(&base).into_iter().flat_map(|m| m.values()))
    }

    /// Look up one catalog definition visible to `base`.
    pub fn definition(&self, base: BaseType, id: &str) -> Option<&PropertyDefinition> {
        self.common
            .get(id)
            .or_else(|| self.by_base.get(&base).and_then(|m| m.get(id)))
    }

    /// Whether `id` is reserved by the catalog.
    ///
    /// The common set and all four base-specific sets are scanned, so a
    /// custom document type cannot declare `cmis:sourceId` either.
    pub fn is_reserved(&self, id: &str) -> bool {
        self.common.contains_key(id) || self.by_base.values().any(|m| m.contains_key(id))
    }
}

impl Default for PropertyCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
