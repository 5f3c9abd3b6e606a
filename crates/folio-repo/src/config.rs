use std::path::Path;

use serde::{Deserialize, Serialize};

use folio_store::StoreLimits;
use folio_types::ObjectId;

use crate::error::{RepoError, RepoResult};

/// Configuration for a [`Repository`](crate::Repository).
///
/// Every key is optional in TOML; missing keys take the defaults below.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub repository_id: String,
    pub repository_name: String,
    /// Id given to the root folder at construction.
    pub root_folder_id: String,
    pub root_folder_name: String,
    /// Principal used by [`Repository::connect_default`](crate::Repository::connect_default).
    pub default_principal: String,
    /// Total content bytes the store may hold.
    pub max_content_bytes: Option<u64>,
    /// Number of objects the store may hold.
    pub max_stored_objects: Option<usize>,
    /// When `true`, updates without a change token are rejected.
    pub enforce_change_tokens: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            repository_id: "folio".into(),
            repository_name: "Folio Repository".into(),
            root_folder_id: "root".into(),
            root_folder_name: "Root".into(),
            default_principal: "anonymous".into(),
            max_content_bytes: None,
            max_stored_objects: None,
            enforce_change_tokens: false,
        }
    }
}

impl RepositoryConfig {
    pub fn from_toml_str(s: &str) -> RepoResult<Self> {
        toml::from_str(s).map_err(|e| RepoError::invalid(format!("invalid configuration: {e}")))
    }

    pub fn load(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RepoError::Storage(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> RepoResult<String> {
        toml::to_string_pretty(self).map_err(|e| RepoError::Storage(e.to_string()))
    }

    pub fn root_id(&self) -> RepoResult<ObjectId> {
        Ok(ObjectId::new(self.root_folder_id.clone())?)
    }

    pub fn limits(&self) -> StoreLimits {
        StoreLimits {
            max_objects: self.max_stored_objects,
            max_content_bytes: self.max_content_bytes,
        }
    }
}
