use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use folio_schema::{InMemoryTypeManager, TypeRegistry};
use folio_store::{Entry, InMemoryObjectStore, StoreResult, StoreState};
use folio_types::{props, BaseType, ObjectId, PropertyCatalog, Value};

use crate::config::RepositoryConfig;
use crate::connection::Connection;
use crate::error::{RepoError, RepoResult};
use crate::properties::stamp_created;

/// State shared by a repository and every connection opened on it.
pub(crate) struct RepositoryInner {
    pub config: RepositoryConfig,
    pub store: InMemoryObjectStore,
    pub types: Arc<dyn TypeRegistry>,
    pub root_id: ObjectId,
}

impl RepositoryInner {
    /// Run `f` under the store's read lock.
    pub fn read<R>(&self, f: impl FnOnce(&StoreState) -> RepoResult<R>) -> RepoResult<R> {
        self.store.read(f)?
    }

    /// Run `f` under the store's write lock. Everything `f` does is atomic
    /// with respect to other connections.
    pub fn write<R>(&self, f: impl FnOnce(&mut StoreState) -> RepoResult<R>) -> RepoResult<R> {
        self.store.write(f)?
    }
}

/// Snapshot returned by [`Repository::info`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepositoryInfo {
    pub id: String,
    pub name: String,
    pub root_folder_id: ObjectId,
    pub objects: usize,
    pub version_series: usize,
    pub content_bytes: u64,
    pub max_content_bytes: Option<u64>,
    pub max_stored_objects: Option<usize>,
}

/// An in-memory content repository.
///
/// Cloning is cheap; clones share the same store and type registry.
#[derive(Clone)]
pub struct Repository {
    inner: Arc<RepositoryInner>,
}

impl Repository {
    /// Create a repository with the standard property catalog and an
    /// in-memory type manager.
    pub fn new(config: RepositoryConfig) -> RepoResult<Self> {
        let catalog = Arc::new(PropertyCatalog::standard());
        Self::with_registry(config, Arc::new(InMemoryTypeManager::new(catalog)))
    }

    /// Create a repository over a caller-supplied type registry.
    pub fn with_registry(
        config: RepositoryConfig,
        types: Arc<dyn TypeRegistry>,
    ) -> RepoResult<Self> {
        let root_id = config.root_id()?;
        let root_type = types.type_definition(BaseType::Folder.id(), false)?;
        if root_type.base_type != Some(BaseType::Folder) {
            return Err(RepoError::Runtime(
                "the type registry has no folder base type".into(),
            ));
        }

        let store = InMemoryObjectStore::new(config.limits());
        let mut root = Entry::new(BaseType::Folder, BaseType::Folder.id());
        root.set_value(
            props::NAME,
            Some(Value::string(config.root_folder_name.clone())),
        );
        stamp_created(&mut root, &config.default_principal);
        store.write(|s| -> StoreResult<()> {
            s.insert_with_id(root, root_id.clone())?;
            // The root is the top of the hierarchy, not an unfiled object.
            s.filing_mut().forget(&root_id);
            Ok(())
        })??;

        info!(
            repository = %config.repository_id,
            root = %root_id,
            "repository initialized"
        );
        Ok(Self {
            inner: Arc::new(RepositoryInner {
                config,
                store,
                types,
                root_id,
            }),
        })
    }

    /// Open a connection acting as `principal`.
    pub fn connect(&self, principal: impl Into<String>) -> Connection {
        Connection::new(Arc::clone(&self.inner), principal.into())
    }

    /// Open a connection acting as the configured default principal.
    pub fn connect_default(&self) -> Connection {
        self.connect(self.inner.config.default_principal.clone())
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.inner.config
    }

    pub fn root_folder_id(&self) -> &ObjectId {
        &self.inner.root_id
    }

    pub fn types(&self) -> &dyn TypeRegistry {
        self.inner.types.as_ref()
    }

    pub fn info(&self) -> RepoResult<RepositoryInfo> {
        let stats = self.inner.store.stats()?;
        let config = &self.inner.config;
        Ok(RepositoryInfo {
            id: config.repository_id.clone(),
            name: config.repository_name.clone(),
            root_folder_id: self.inner.root_id.clone(),
            objects: stats.objects,
            version_series: stats.version_series,
            content_bytes: stats.content_bytes,
            max_content_bytes: config.max_content_bytes,
            max_stored_objects: config.max_stored_objects,
        })
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("id", &self.inner.config.repository_id)
            .field("root", &self.inner.root_id)
            .field("object_count", &self.inner.store.len())
            .finish()
    }
}
