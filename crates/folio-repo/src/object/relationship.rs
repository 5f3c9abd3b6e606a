use serde::{Deserialize, Serialize};

use folio_types::{props, ObjectId};

use super::{facade, CmisObject, ObjectCore};
use crate::error::{RepoError, RepoResult};

/// Which end of a relationship an object must be on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipDirection {
    #[default]
    Source,
    Target,
    Either,
}

impl RelationshipDirection {
    pub fn includes_source(self) -> bool {
        matches!(self, Self::Source | Self::Either)
    }

    pub fn includes_target(self) -> bool {
        matches!(self, Self::Target | Self::Either)
    }
}

/// A relationship facade.
#[derive(Clone, Debug)]
pub struct Relationship {
    core: ObjectCore,
}

facade!(Relationship);

impl Relationship {
    pub fn source_id(&self) -> RepoResult<ObjectId> {
        self.endpoint(props::SOURCE_ID)
    }

    pub fn target_id(&self) -> RepoResult<ObjectId> {
        self.endpoint(props::TARGET_ID)
    }

    pub fn source(&self) -> RepoResult<CmisObject> {
        self.connection().object(&self.source_id()?)
    }

    pub fn target(&self) -> RepoResult<CmisObject> {
        self.connection().object(&self.target_id()?)
    }

    fn endpoint(&self, property_id: &str) -> RepoResult<ObjectId> {
        let raw = self
            .string(property_id)?
            .ok_or_else(|| RepoError::Runtime(format!("relationship has no {property_id}")))?;
        Ok(ObjectId::new(raw)?)
    }
}
