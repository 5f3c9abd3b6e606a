use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use folio_types::{props, BaseType, ContentStream, ObjectId, VersionSeriesId};

use crate::entry::Entry;
use crate::error::{StoreError, StoreResult};
use crate::index::{EdgeIndex, FilingIndex, PolicyIndex};
use crate::series::VersionSeries;

/// Memory quotas. `None` means unlimited.
///
/// Content is counted per buffer: versions that share a stream after
/// checkout are charged once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreLimits {
    pub max_objects: Option<usize>,
    pub max_content_bytes: Option<u64>,
}

/// Point-in-time counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub objects: usize,
    pub version_series: usize,
    pub content_bytes: u64,
}

/// Every entry and index, guarded as one unit by [`InMemoryObjectStore`].
#[derive(Debug, Default)]
pub struct StoreState {
    entries: HashMap<ObjectId, Entry>,
    filing: FilingIndex,
    edges: EdgeIndex,
    policies: PolicyIndex,
    series: HashMap<VersionSeriesId, VersionSeries>,
    limits: StoreLimits,
}

impl StoreState {
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            limits,
            ..Default::default()
        }
    }

    // -----------------------------------------------------------------------
    // Entries
    // -----------------------------------------------------------------------

    pub fn entry(&self, id: &ObjectId) -> Option<&Entry> {
        self.entries.get(id)
    }

    pub fn entry_mut(&mut self, id: &ObjectId) -> Option<&mut Entry> {
        self.entries.get_mut(id)
    }

    pub fn require(&self, id: &ObjectId) -> StoreResult<&Entry> {
        self.entries
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    pub fn require_mut(&mut self, id: &ObjectId) -> StoreResult<&mut Entry> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist a transient entry under a freshly generated id.
    pub fn insert(&mut self, entry: Entry) -> StoreResult<ObjectId> {
        self.insert_with_id(entry, ObjectId::generate())
    }

    /// Persist a transient entry under a caller-chosen id.
    ///
    /// Fileable objects start out unfiled; callers file them afterwards.
    pub fn insert_with_id(&mut self, mut entry: Entry, id: ObjectId) -> StoreResult<ObjectId> {
        if self.entries.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }
        if let Some(limit) = self.limits.max_objects {
            if self.entries.len() >= limit {
                return Err(StoreError::QuotaExceeded {
                    resource: "object",
                    limit: limit as u64,
                    requested: self.entries.len() as u64 + 1,
                });
            }
        }
        let additional = match entry.content() {
            Some(cs) if !self.holds_buffer(cs, None) => cs.len(),
            _ => 0,
        };
        self.check_content_quota(additional, 0)?;

        entry.assign_id(id.clone());
        if entry.base_type().is_fileable() {
            self.filing.mark_unfiled(&id);
        }
        debug!(id = %id, base = %entry.base_type(), type_id = entry.type_id(), "stored entry");
        self.entries.insert(id.clone(), entry);
        Ok(id)
    }

    /// Remove an entry and every index membership it has.
    ///
    /// A version series left without members is dropped as well.
    pub fn remove(&mut self, id: &ObjectId) -> StoreResult<Entry> {
        let entry = self
            .entries
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        self.filing.forget(id);

        if entry.base_type() == BaseType::Relationship {
            let source = entry.string(props::SOURCE_ID).map(ObjectId::new);
            let target = entry.string(props::TARGET_ID).map(ObjectId::new);
            if let (Some(Ok(source)), Some(Ok(target))) = (source, target) {
                self.edges.unlink(id, &source, &target);
            }
        }

        for policy in entry.policies() {
            self.policies.remove(policy, id);
        }
        if entry.base_type() == BaseType::Policy {
            let targets: Vec<ObjectId> = self.policies.targets(id).cloned().collect();
            for target in targets {
                self.policies.remove(id, &target);
                if let Some(e) = self.entries.get_mut(&target) {
                    e.remove_policy(id);
                }
            }
        }

        if let Some(Ok(series_id)) = entry
            .string(props::VERSION_SERIES_ID)
            .map(VersionSeriesId::new)
        {
            let emptied = match self.series.get_mut(&series_id) {
                Some(series) => {
                    series.remove(id);
                    series.is_empty()
                }
                None => false,
            };
            if emptied {
                self.series.remove(&series_id);
                debug!(series = %series_id, "dropped empty version series");
            }
        }

        debug!(id = %id, "removed entry");
        Ok(entry)
    }

    // -----------------------------------------------------------------------
    // Content
    // -----------------------------------------------------------------------

    /// Total bytes of content held by all entries, each shared buffer once.
    pub fn content_bytes(&self) -> u64 {
        let mut seen = HashSet::new();
        self.entries
            .values()
            .filter_map(Entry::content)
            .filter(|cs| seen.insert(buffer_key(cs)))
            .map(ContentStream::len)
            .sum()
    }

    /// Whether an entry other than `except` already holds the buffer of `cs`.
    fn holds_buffer(&self, cs: &ContentStream, except: Option<&ObjectId>) -> bool {
        let key = buffer_key(cs);
        self.entries.iter().any(|(id, e)| {
            Some(id) != except && e.content().is_some_and(|other| buffer_key(other) == key)
        })
    }

    /// Fail if adding `additional` bytes (after releasing `released`) would
    /// exceed the content quota.
    pub fn check_content_quota(&self, additional: u64, released: u64) -> StoreResult<()> {
        let Some(limit) = self.limits.max_content_bytes else {
            return Ok(());
        };
        let requested = (self.content_bytes() + additional).saturating_sub(released);
        if requested > limit {
            return Err(StoreError::QuotaExceeded {
                resource: "content",
                limit,
                requested,
            });
        }
        Ok(())
    }

    /// Fail if replacing the content of `id` with `content` would exceed
    /// the content quota.
    pub fn check_content_replacement(
        &self,
        id: &ObjectId,
        content: Option<&ContentStream>,
    ) -> StoreResult<()> {
        let released = match self.require(id)?.content() {
            Some(cs) if !self.holds_buffer(cs, Some(id)) => cs.len(),
            _ => 0,
        };
        let additional = match content {
            Some(cs) if !self.holds_buffer(cs, None) => cs.len(),
            _ => 0,
        };
        self.check_content_quota(additional, released)
    }

    /// Replace the content of a stored entry, enforcing the content quota.
    pub fn set_content(&mut self, id: &ObjectId, content: Option<ContentStream>) -> StoreResult<()> {
        self.check_content_replacement(id, content.as_ref())?;
        self.require_mut(id)?.set_content(content);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Indexes
    // -----------------------------------------------------------------------

    pub fn filing(&self) -> &FilingIndex {
        &self.filing
    }

    pub fn filing_mut(&mut self) -> &mut FilingIndex {
        &mut self.filing
    }

    pub fn edges(&self) -> &EdgeIndex {
        &self.edges
    }

    pub fn edges_mut(&mut self) -> &mut EdgeIndex {
        &mut self.edges
    }

    pub fn policies(&self) -> &PolicyIndex {
        &self.policies
    }

    pub fn policies_mut(&mut self) -> &mut PolicyIndex {
        &mut self.policies
    }

    // -----------------------------------------------------------------------
    // Version series
    // -----------------------------------------------------------------------

    pub fn series(&self, id: &VersionSeriesId) -> Option<&VersionSeries> {
        self.series.get(id)
    }

    pub fn series_mut(&mut self, id: &VersionSeriesId) -> StoreResult<&mut VersionSeries> {
        self.series
            .get_mut(id)
            .ok_or_else(|| StoreError::SeriesNotFound(id.clone()))
    }

    pub fn insert_series(&mut self, series: VersionSeries) {
        debug!(series = %series.id(), "registered version series");
        self.series.insert(series.id().clone(), series);
    }

    /// The series an entry belongs to, if it is a document.
    pub fn series_of(&self, id: &ObjectId) -> Option<&VersionSeries> {
        let sid = self.entries.get(id)?.string(props::VERSION_SERIES_ID)?;
        let sid = VersionSeriesId::new(sid).ok()?;
        self.series.get(&sid)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            objects: self.entries.len(),
            version_series: self.series.len(),
            content_bytes: self.content_bytes(),
        }
    }
}

/// Thread-safe in-memory object store.
///
/// All state sits behind one `RwLock`. Readers run concurrently; a writer
/// holds the lock for the full duration of its closure, which is what makes
/// multi-entry operations such as checkout or tree deletion atomic.
pub struct InMemoryObjectStore {
    state: RwLock<StoreState>,
}

impl InMemoryObjectStore {
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            state: RwLock::new(StoreState::new(limits)),
        }
    }

    /// Run `f` with shared access to the store.
    pub fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> StoreResult<R> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(f(&state))
    }

    /// Run `f` with exclusive access to the store.
    pub fn write<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> StoreResult<R> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(f(&mut state))
    }

    /// Clone of one entry.
    pub fn get(&self, id: &ObjectId) -> StoreResult<Option<Entry>> {
        self.read(|s| s.entry(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.read(StoreState::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StoreResult<StoreStats> {
        self.read(StoreState::stats)
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new(StoreLimits::default())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .finish()
    }
}

fn buffer_key(cs: &ContentStream) -> (usize, usize) {
    (cs.data.as_ptr() as usize, cs.data.len())
}
