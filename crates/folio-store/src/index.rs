//! Auxiliary indexes over stored entries.
//!
//! Each index is a plain data structure with no locking; the owning
//! [`StoreState`](crate::StoreState) is guarded as a whole.

use std::collections::{BTreeSet, HashMap};

use folio_types::ObjectId;

/// Parent/child filing in both directions, plus the set of unfiled objects.
#[derive(Clone, Debug, Default)]
pub struct FilingIndex {
    children: HashMap<ObjectId, BTreeSet<ObjectId>>,
    parents: HashMap<ObjectId, BTreeSet<ObjectId>>,
    unfiled: BTreeSet<ObjectId>,
}

impl FilingIndex {
    /// File `child` under `parent`. Returns `false` if it already was.
    pub fn file(&mut self, parent: &ObjectId, child: &ObjectId) -> bool {
        self.unfiled.remove(child);
        self.parents
            .entry(child.clone())
            .or_default()
            .insert(parent.clone());
        self.children
            .entry(parent.clone())
            .or_default()
            .insert(child.clone())
    }

    /// Remove `child` from `parent`. A child left with no parent becomes
    /// unfiled. Returns `false` if the child was not filed there.
    pub fn unfile(&mut self, parent: &ObjectId, child: &ObjectId) -> bool {
        let removed = self
            .children
            .get_mut(parent)
            .map(|set| set.remove(child))
            .unwrap_or(false);
        if let Some(set) = self.children.get(parent) {
            if set.is_empty() {
                self.children.remove(parent);
            }
        }
        if let Some(set) = self.parents.get_mut(child) {
            set.remove(parent);
            if set.is_empty() {
                self.parents.remove(child);
                self.unfiled.insert(child.clone());
            }
        }
        removed
    }

    /// Record an object as persisted without any parent.
    pub fn mark_unfiled(&mut self, id: &ObjectId) {
        if !self.parents.contains_key(id) {
            self.unfiled.insert(id.clone());
        }
    }

    /// Drop every filing fact about `id`. Its former children (if any) are
    /// left unfiled.
    pub fn forget(&mut self, id: &ObjectId) {
        if let Some(parents) = self.parents.remove(id) {
            for parent in parents {
                if let Some(set) = self.children.get_mut(&parent) {
                    set.remove(id);
                    if set.is_empty() {
                        self.children.remove(&parent);
                    }
                }
            }
        }
        if let Some(children) = self.children.remove(id) {
            for child in children {
                if let Some(set) = self.parents.get_mut(&child) {
                    set.remove(id);
                    if set.is_empty() {
                        self.parents.remove(&child);
                        self.unfiled.insert(child);
                    }
                }
            }
        }
        self.unfiled.remove(id);
    }

    pub fn children(&self, id: &ObjectId) -> impl Iterator<Item = &ObjectId> {
        self.children.get(id).into_iter().flatten()
    }

    pub fn parents(&self, id: &ObjectId) -> impl Iterator<Item = &ObjectId> {
        self.parents.get(id).into_iter().flatten()
    }

    pub fn parent_count(&self, id: &ObjectId) -> usize {
        self.parents.get(id).map(BTreeSet::len).unwrap_or(0)
    }

    pub fn has_children(&self, id: &ObjectId) -> bool {
        self.children.get(id).map(|s| !s.is_empty()).unwrap_or(false)
    }

    pub fn is_filed_in(&self, parent: &ObjectId, child: &ObjectId) -> bool {
        self.children
            .get(parent)
            .map(|s| s.contains(child))
            .unwrap_or(false)
    }

    pub fn is_unfiled(&self, id: &ObjectId) -> bool {
        self.unfiled.contains(id)
    }

    pub fn unfiled(&self) -> impl Iterator<Item = &ObjectId> {
        self.unfiled.iter()
    }
}

/// Relationship ids keyed by endpoint.
#[derive(Clone, Debug, Default)]
pub struct EdgeIndex {
    by_source: HashMap<ObjectId, BTreeSet<ObjectId>>,
    by_target: HashMap<ObjectId, BTreeSet<ObjectId>>,
}

impl EdgeIndex {
    pub fn link(&mut self, relationship: &ObjectId, source: &ObjectId, target: &ObjectId) {
        self.by_source
            .entry(source.clone())
            .or_default()
            .insert(relationship.clone());
        self.by_target
            .entry(target.clone())
            .or_default()
            .insert(relationship.clone());
    }

    pub fn unlink(&mut self, relationship: &ObjectId, source: &ObjectId, target: &ObjectId) {
        remove_from(&mut self.by_source, source, relationship);
        remove_from(&mut self.by_target, target, relationship);
    }

    /// Relationships whose source is `id`.
    pub fn outgoing(&self, id: &ObjectId) -> impl Iterator<Item = &ObjectId> {
        self.by_source.get(id).into_iter().flatten()
    }

    /// Relationships whose target is `id`.
    pub fn incoming(&self, id: &ObjectId) -> impl Iterator<Item = &ObjectId> {
        self.by_target.get(id).into_iter().flatten()
    }

    /// Whether `id` is an endpoint of any relationship.
    pub fn is_endpoint(&self, id: &ObjectId) -> bool {
        self.by_source.get(id).map(|s| !s.is_empty()).unwrap_or(false)
            || self.by_target.get(id).map(|s| !s.is_empty()).unwrap_or(false)
    }
}

/// Objects each policy is applied to.
#[derive(Clone, Debug, Default)]
pub struct PolicyIndex {
    targets: HashMap<ObjectId, BTreeSet<ObjectId>>,
}

impl PolicyIndex {
    pub fn apply(&mut self, policy: &ObjectId, object: &ObjectId) -> bool {
        self.targets
            .entry(policy.clone())
            .or_default()
            .insert(object.clone())
    }

    pub fn remove(&mut self, policy: &ObjectId, object: &ObjectId) -> bool {
        remove_from(&mut self.targets, policy, object)
    }

    pub fn targets(&self, policy: &ObjectId) -> impl Iterator<Item = &ObjectId> {
        self.targets.get(policy).into_iter().flatten()
    }

    /// Whether `policy` is applied to any object other than itself.
    pub fn is_applied_elsewhere(&self, policy: &ObjectId) -> bool {
        self.targets(policy).any(|t| t != policy)
    }
}

fn remove_from(
    map: &mut HashMap<ObjectId, BTreeSet<ObjectId>>,
    key: &ObjectId,
    value: &ObjectId,
) -> bool {
    let Some(set) = map.get_mut(key) else {
        return false;
    };
    let removed = set.remove(value);
    if set.is_empty() {
        map.remove(key);
    }
    removed
}
