//! Folder hierarchy rules: visible children, sibling names, paths, and
//! allowed child types.
//!
//! Filing is version-independent: every version of a document is filed in
//! the same folders, so the helpers here file and unfile whole series.

use std::collections::HashSet;

use folio_store::{Entry, StoreState};
use folio_types::{props, BaseType, ObjectId};

use crate::error::{RepoError, RepoResult};

/// Whether `entry` shows up in folder listings. Only the latest version of
/// a series is listed, or its PWC when nothing has been checked in yet.
pub(crate) fn is_listed(state: &StoreState, entry: &Entry) -> bool {
    if entry.base_type() != BaseType::Document {
        return true;
    }
    if entry.flag(props::IS_LATEST_VERSION) {
        return true;
    }
    let Some(id) = entry.id() else {
        return false;
    };
    state
        .series_of(id)
        .is_some_and(|series| series.checked_out() == Some(id) && series.checked_in().next().is_none())
}

/// Listed children of a folder, sorted by name.
pub(crate) fn listed_children(state: &StoreState, folder: &ObjectId) -> Vec<ObjectId> {
    let mut children: Vec<(&str, &ObjectId)> = state
        .filing()
        .children(folder)
        .filter_map(|id| state.entry(id).map(|e| (id, e)))
        .filter(|(_, e)| is_listed(state, e))
        .map(|(id, e)| (e.name().unwrap_or_default(), id))
        .collect();
    children.sort();
    children.into_iter().map(|(_, id)| id.clone()).collect()
}

/// Ids that belong to the same object for filing purposes: the whole
/// version series for documents, the object alone otherwise.
pub(crate) fn filing_unit(state: &StoreState, id: &ObjectId) -> Vec<ObjectId> {
    match state.series_of(id) {
        Some(series) => series.members().to_vec(),
        None => vec![id.clone()],
    }
}

/// Fail if `folder` already lists a different object called `name`.
pub(crate) fn check_unique_name(
    state: &StoreState,
    folder: &ObjectId,
    name: &str,
    exclude: Option<&ObjectId>,
) -> RepoResult<()> {
    let excluded: HashSet<ObjectId> = exclude
        .map(|id| filing_unit(state, id).into_iter().collect())
        .unwrap_or_default();
    for child in state.filing().children(folder) {
        if excluded.contains(child) {
            continue;
        }
        let Some(entry) = state.entry(child) else {
            continue;
        };
        if is_listed(state, entry) && entry.name() == Some(name) {
            return Err(RepoError::NameConstraintViolation(format!(
                "folder {folder} already contains an object named {name:?}"
            )));
        }
    }
    Ok(())
}

/// Fail if `folder` restricts its children and `type_id` is not allowed.
pub(crate) fn check_allowed_child(
    state: &StoreState,
    folder: &ObjectId,
    type_id: &str,
) -> RepoResult<()> {
    let entry = require_folder(state, folder)?;
    if let Some(allowed) = entry
        .value(props::ALLOWED_CHILD_OBJECT_TYPE_IDS)
        .and_then(|v| v.as_strings())
    {
        if !allowed.iter().any(|t| t == type_id) {
            return Err(RepoError::constraint(format!(
                "folder {folder} does not accept objects of type {type_id}"
            )));
        }
    }
    Ok(())
}

pub(crate) fn require_folder<'a>(state: &'a StoreState, id: &ObjectId) -> RepoResult<&'a Entry> {
    let entry = state.require(id)?;
    if entry.base_type() != BaseType::Folder {
        return Err(RepoError::invalid(format!("{id} is not a folder")));
    }
    Ok(entry)
}

/// All checks for placing object `id` (of type `type_id`, named `name`)
/// into `folder`.
pub(crate) fn check_placement(
    state: &StoreState,
    folder: &ObjectId,
    type_id: &str,
    name: &str,
    id: Option<&ObjectId>,
) -> RepoResult<()> {
    check_allowed_child(state, folder, type_id)?;
    check_unique_name(state, folder, name, id)
}

/// File every member of `id`'s filing unit under `folder`.
pub(crate) fn file_unit(state: &mut StoreState, folder: &ObjectId, id: &ObjectId) {
    for member in filing_unit(state, id) {
        state.filing_mut().file(folder, &member);
    }
}

/// Unfile every member of `id`'s filing unit from `folder`.
pub(crate) fn unfile_unit(state: &mut StoreState, folder: &ObjectId, id: &ObjectId) {
    for member in filing_unit(state, id) {
        state.filing_mut().unfile(folder, &member);
    }
}

/// Whether `candidate` is `ancestor` or lies somewhere below it.
pub(crate) fn is_descendant_or_self(
    state: &StoreState,
    candidate: &ObjectId,
    ancestor: &ObjectId,
) -> bool {
    let mut current = Some(candidate.clone());
    while let Some(id) = current {
        if &id == ancestor {
            return true;
        }
        current = state.filing().parents(&id).next().cloned();
    }
    false
}

/// Absolute path of a folder. The root is `/`.
pub(crate) fn folder_path(
    state: &StoreState,
    folder: &ObjectId,
    root: &ObjectId,
) -> RepoResult<String> {
    let mut names = Vec::new();
    let mut current = folder.clone();
    while &current != root {
        let entry = require_folder(state, &current)?;
        names.push(entry.name().unwrap_or_default().to_string());
        current = match state.filing().parents(&current).next() {
            Some(parent) => parent.clone(),
            None => {
                return Err(RepoError::Runtime(format!(
                    "folder {current} is not connected to the root"
                )))
            }
        };
    }
    names.reverse();
    Ok(format!("/{}", names.join("/")))
}

/// Resolve an absolute path to an object id.
pub(crate) fn resolve_path(state: &StoreState, path: &str, root: &ObjectId) -> RepoResult<ObjectId> {
    if !path.starts_with('/') {
        return Err(RepoError::invalid(format!("path {path:?} is not absolute")));
    }
    let mut current = root.clone();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let next = state
            .filing()
            .children(&current)
            .filter_map(|id| state.entry(id))
            .find(|e| is_listed(state, e) && e.name() == Some(segment))
            .and_then(|e| e.id().cloned());
        current = next.ok_or_else(|| RepoError::ObjectNotFound(path.to_string()))?;
    }
    Ok(current)
}

/// The single parent of a fileable object, `None` when unfiled.
pub(crate) fn single_parent(state: &StoreState, id: &ObjectId) -> RepoResult<Option<ObjectId>> {
    let mut parents = state.filing().parents(id);
    let first = parents.next().cloned();
    if parents.next().is_some() {
        return Err(RepoError::constraint(format!(
            "{id} is filed in more than one folder"
        )));
    }
    Ok(first)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
