//! Deletion with referential-integrity guards.

use tracing::{debug, info, warn};

use folio_store::StoreState;
use folio_types::{BaseType, ObjectId};

use crate::error::{RepoError, RepoResult};
use crate::versioning;

/// Delete one object.
///
/// Refuses the root folder, non-empty folders, policies applied to other
/// objects, and relationship endpoints. Deleting a private working copy
/// cancels the checkout and leaves the checked-in versions alone, whatever
/// `all_versions` says. Otherwise, with `all_versions`, a document takes
/// its whole version series with it.
pub(crate) fn delete_object(
    state: &mut StoreState,
    id: &ObjectId,
    all_versions: bool,
    root_id: &ObjectId,
) -> RepoResult<()> {
    if id == root_id {
        return Err(RepoError::constraint("the root folder cannot be deleted"));
    }
    let base = state.require(id)?.base_type();
    match base {
        BaseType::Folder => {
            if state.filing().has_children(id) {
                return Err(RepoError::constraint(format!("folder {id} is not empty")));
            }
        }
        BaseType::Policy => {
            if state.policies().is_applied_elsewhere(id) {
                return Err(RepoError::constraint(format!(
                    "policy {id} is still applied to other objects"
                )));
            }
        }
        BaseType::Document if versioning::is_pwc(state, id) => {
            return versioning::cancel_checkout(state, id);
        }
        BaseType::Document if all_versions => return delete_series(state, id),
        BaseType::Document => return delete_version(state, id),
        BaseType::Relationship => {}
    }
    check_not_endpoint(state, id)?;
    state.remove(id)?;
    info!(id = %id, base = %base, "deleted object");
    Ok(())
}

pub(crate) fn check_not_endpoint(state: &StoreState, id: &ObjectId) -> RepoResult<()> {
    if state.edges().is_endpoint(id) {
        return Err(RepoError::constraint(format!(
            "{id} is the source or target of a relationship"
        )));
    }
    Ok(())
}

fn delete_series(state: &mut StoreState, id: &ObjectId) -> RepoResult<()> {
    let series_id = versioning::series_id_of(state, id)?;
    let members = versioning::all_versions(state, &series_id)?;
    for member in &members {
        check_not_endpoint(state, member)?;
    }
    for member in &members {
        state.remove(member)?;
    }
    info!(series = %series_id, versions = members.len(), "deleted version series");
    Ok(())
}

fn delete_version(state: &mut StoreState, id: &ObjectId) -> RepoResult<()> {
    check_not_endpoint(state, id)?;
    let series_id = versioning::series_id_of(state, id)?;
    if let Some(series) = state.series(&series_id) {
        if series.is_checked_out() && series.checked_in().count() == 1 {
            return Err(RepoError::constraint(format!(
                "{id} is the only checked-in version of a checked-out series"
            )));
        }
    }
    state.remove(id)?;
    versioning::elect_latest(state, &series_id)?;
    info!(id = %id, series = %series_id, "deleted version");
    Ok(())
}

/// Delete a folder and everything filed below it, children before parents.
///
/// With `continue_on_failure`, objects that cannot be deleted are skipped
/// (and so are the folders containing them); otherwise the walk stops at
/// the first failure. Returns the ids that could not be deleted.
pub(crate) fn delete_tree(
    state: &mut StoreState,
    folder_id: &ObjectId,
    all_versions: bool,
    continue_on_failure: bool,
    root_id: &ObjectId,
) -> RepoResult<Vec<ObjectId>> {
    if folder_id == root_id {
        return Err(RepoError::constraint("the root folder cannot be deleted"));
    }
    if state.require(folder_id)?.base_type() != BaseType::Folder {
        return Err(RepoError::invalid(format!("{folder_id} is not a folder")));
    }

    let mut failed = Vec::new();
    walk(
        state,
        folder_id,
        all_versions,
        continue_on_failure,
        root_id,
        &mut failed,
    );
    info!(folder = %folder_id, failed = failed.len(), "deleted tree");
    Ok(failed)
}

/// Post-order walk. Returns `false` once the walk should stop.
fn walk(
    state: &mut StoreState,
    id: &ObjectId,
    all_versions: bool,
    continue_on_failure: bool,
    root_id: &ObjectId,
    failed: &mut Vec<ObjectId>,
) -> bool {
    let is_folder = state
        .entry(id)
        .is_some_and(|e| e.base_type() == BaseType::Folder);
    if is_folder {
        let mut children: Vec<ObjectId> = state.filing().children(id).cloned().collect();
        // Working copies go first so their series are checked in again
        // before the remaining versions are deleted.
        children.sort_by_key(|child| !versioning::is_pwc(state, child));
        for child in &children {
            // Earlier siblings may have taken this one with them.
            if !state.contains(child) {
                continue;
            }
            // Multi-filed objects stay alive under their other parents.
            if state.filing().parent_count(child) > 1 {
                state.filing_mut().unfile(id, child);
                debug!(id = %child, folder = %id, "unfiled multi-filed object");
                continue;
            }
            if !walk(state, child, all_versions, continue_on_failure, root_id, failed) {
                return false;
            }
        }
    }

    match delete_object(state, id, all_versions, root_id) {
        Ok(()) => true,
        Err(e) => {
            warn!(id = %id, error = %e, "could not delete object in tree");
            failed.push(id.clone());
            continue_on_failure
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
