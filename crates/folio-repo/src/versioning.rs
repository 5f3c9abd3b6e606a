//! Checkout, checkin, and cancel-checkout over a locked [`StoreState`].
//!
//! Every function here runs inside one `InMemoryObjectStore::write` closure,
//! so a series is never observed half checked-out.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use folio_store::{Entry, StoreState, VersionSeries};
use folio_types::{props, BaseType, ObjectId, Value, VersionSeriesId};

use crate::error::{RepoError, RepoResult};

/// Initial state of a newly created document's version series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersioningState {
    /// The type is not versionable.
    None,
    #[default]
    Major,
    Minor,
    /// Create the document directly as a private working copy.
    CheckedOut,
}

/// A `major.minor` version label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionLabel {
    pub major: u32,
    pub minor: u32,
}

impl VersionLabel {
    pub const FIRST_MAJOR: VersionLabel = VersionLabel { major: 1, minor: 0 };
    pub const FIRST_MINOR: VersionLabel = VersionLabel { major: 0, minor: 1 };

    pub fn parse(s: &str) -> Option<Self> {
        let (major, minor) = s.split_once('.')?;
        Some(Self {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }

    /// The label following `self` for a major or minor checkin.
    pub fn next(self, major: bool) -> Self {
        if major {
            Self {
                major: self.major + 1,
                minor: 0,
            }
        } else {
            Self {
                major: self.major,
                minor: self.minor + 1,
            }
        }
    }

    pub fn first(major: bool) -> Self {
        if major {
            Self::FIRST_MAJOR
        } else {
            Self::FIRST_MINOR
        }
    }
}

impl fmt::Display for VersionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Label carried by a private working copy.
pub const PWC_LABEL: &str = "pwc";

// ---------------------------------------------------------------------------
// Series bookkeeping
// ---------------------------------------------------------------------------

/// Version properties for a freshly created document, and the series it
/// starts. Returns the series id.
pub(crate) fn start_series(
    entry: &mut Entry,
    state: VersioningState,
    principal: &str,
) -> VersionSeriesId {
    let series_id = VersionSeriesId::generate();
    entry.set_value(props::VERSION_SERIES_ID, Some(Value::string(series_id.as_str())));
    entry.set_value(props::IS_IMMUTABLE, Some(Value::boolean(false)));
    match state {
        VersioningState::CheckedOut => {
            set_pwc_flags(entry);
            entry.set_value(props::IS_VERSION_SERIES_CHECKED_OUT, Some(Value::boolean(true)));
            entry.set_value(
                props::VERSION_SERIES_CHECKED_OUT_BY,
                Some(Value::string(principal)),
            );
        }
        VersioningState::None | VersioningState::Major | VersioningState::Minor => {
            let major = state != VersioningState::Minor;
            set_version_flags(entry, VersionLabel::first(major), major, major);
            entry.set_value(props::IS_VERSION_SERIES_CHECKED_OUT, Some(Value::boolean(false)));
        }
    }
    series_id
}

/// Register a just-inserted document in its series.
pub(crate) fn register_member(
    state: &mut StoreState,
    series_id: &VersionSeriesId,
    id: &ObjectId,
    checked_out: bool,
) -> RepoResult<()> {
    if state.series(series_id).is_none() {
        state.insert_series(VersionSeries::new(series_id.clone()));
    }
    let series = state.series_mut(series_id)?;
    series.push(id.clone());
    if checked_out {
        series.set_checked_out(Some(id.clone()));
        state.require_mut(id)?.set_value(
            props::VERSION_SERIES_CHECKED_OUT_ID,
            Some(Value::string(id.as_str())),
        );
    }
    Ok(())
}

fn set_version_flags(entry: &mut Entry, label: VersionLabel, major: bool, latest_major: bool) {
    entry.set_value(props::VERSION_LABEL, Some(Value::string(label.to_string())));
    entry.set_value(props::IS_LATEST_VERSION, Some(Value::boolean(true)));
    entry.set_value(props::IS_MAJOR_VERSION, Some(Value::boolean(major)));
    entry.set_value(props::IS_LATEST_MAJOR_VERSION, Some(Value::boolean(latest_major)));
}

fn set_pwc_flags(entry: &mut Entry) {
    entry.set_value(props::VERSION_LABEL, Some(Value::string(PWC_LABEL)));
    entry.set_value(props::IS_LATEST_VERSION, Some(Value::boolean(false)));
    entry.set_value(props::IS_MAJOR_VERSION, Some(Value::boolean(false)));
    entry.set_value(props::IS_LATEST_MAJOR_VERSION, Some(Value::boolean(false)));
    entry.set_value(props::CHECKIN_COMMENT, None);
}

fn set_checked_out_flags(entry: &mut Entry, checked_out: Option<(&str, &ObjectId)>) {
    match checked_out {
        Some((principal, pwc)) => {
            entry.set_value(props::IS_VERSION_SERIES_CHECKED_OUT, Some(Value::boolean(true)));
            entry.set_value(
                props::VERSION_SERIES_CHECKED_OUT_BY,
                Some(Value::string(principal)),
            );
            entry.set_value(
                props::VERSION_SERIES_CHECKED_OUT_ID,
                Some(Value::string(pwc.as_str())),
            );
        }
        None => {
            entry.set_value(props::IS_VERSION_SERIES_CHECKED_OUT, Some(Value::boolean(false)));
            entry.set_value(props::VERSION_SERIES_CHECKED_OUT_BY, None);
            entry.set_value(props::VERSION_SERIES_CHECKED_OUT_ID, None);
        }
    }
}

/// The series of a stored document.
pub(crate) fn series_id_of(state: &StoreState, id: &ObjectId) -> RepoResult<VersionSeriesId> {
    let entry = state.require(id)?;
    if entry.base_type() != BaseType::Document {
        return Err(RepoError::invalid(format!("{id} is not a document")));
    }
    let sid = entry
        .string(props::VERSION_SERIES_ID)
        .ok_or_else(|| RepoError::Runtime(format!("document {id} has no version series")))?;
    Ok(VersionSeriesId::new(sid)?)
}

pub(crate) fn is_pwc(state: &StoreState, id: &ObjectId) -> bool {
    state
        .series_of(id)
        .and_then(VersionSeries::checked_out)
        .is_some_and(|pwc| pwc == id)
}

/// Re-elect the latest and latest-major versions after members changed.
pub(crate) fn elect_latest(state: &mut StoreState, series_id: &VersionSeriesId) -> RepoResult<()> {
    let Some(series) = state.series(series_id) else {
        return Ok(());
    };
    let checked_in: Vec<ObjectId> = series.checked_in().cloned().collect();
    let latest = checked_in.first().cloned();
    let latest_major = checked_in
        .iter()
        .find(|id| {
            state
                .entry(id)
                .is_some_and(|e| e.flag(props::IS_MAJOR_VERSION))
        })
        .cloned();
    for id in &checked_in {
        let entry = state.require_mut(id)?;
        entry.set_value(
            props::IS_LATEST_VERSION,
            Some(Value::boolean(Some(id) == latest.as_ref())),
        );
        entry.set_value(
            props::IS_LATEST_MAJOR_VERSION,
            Some(Value::boolean(Some(id) == latest_major.as_ref())),
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Create a private working copy of `doc_id`. The copy is filed wherever
/// the source is filed and carries the same policies.
pub(crate) fn checkout(
    state: &mut StoreState,
    doc_id: &ObjectId,
    principal: &str,
) -> RepoResult<ObjectId> {
    let series_id = series_id_of(state, doc_id)?;
    let series = state.series_mut(&series_id)?;
    if let Some(pwc) = series.checked_out() {
        return Err(RepoError::Versioning(format!(
            "version series {series_id} is already checked out as {pwc}"
        )));
    }

    let source = state.require(doc_id)?;
    let mut copy = source.detached_copy();
    set_pwc_flags(&mut copy);
    crate::properties::stamp_created(&mut copy, principal);
    let parents: Vec<ObjectId> = state.filing().parents(doc_id).cloned().collect();

    let pwc_id = state.insert(copy)?;
    for parent in &parents {
        state.filing_mut().file(parent, &pwc_id);
    }
    let policies: Vec<ObjectId> = state.require(&pwc_id)?.policies().iter().cloned().collect();
    for policy in &policies {
        state.policies_mut().apply(policy, &pwc_id);
    }

    let series = state.series_mut(&series_id)?;
    series.push(pwc_id.clone());
    series.set_checked_out(Some(pwc_id.clone()));
    let members: Vec<ObjectId> = series.members().to_vec();
    for member in &members {
        set_checked_out_flags(state.require_mut(member)?, Some((principal, &pwc_id)));
    }

    info!(document = %doc_id, pwc = %pwc_id, series = %series_id, principal, "checked out");
    Ok(pwc_id)
}

/// Promote the private working copy `pwc_id` to the latest version.
///
/// Property, content, ACL, and policy changes are applied to the PWC by the
/// caller inside the same write closure before this runs.
pub(crate) fn checkin(
    state: &mut StoreState,
    pwc_id: &ObjectId,
    major: bool,
    comment: Option<&str>,
) -> RepoResult<()> {
    let series_id = require_pwc(state, pwc_id)?;
    let series = state.series_mut(&series_id)?;
    let previous = series.checked_in().next().cloned();

    let label = match &previous {
        Some(prev) => {
            let prev_label = state
                .require(prev)?
                .string(props::VERSION_LABEL)
                .and_then(VersionLabel::parse)
                .unwrap_or(VersionLabel::FIRST_MINOR);
            prev_label.next(major)
        }
        None => VersionLabel::first(major),
    };

    let series = state.series_mut(&series_id)?;
    series.set_checked_out(None);
    let members: Vec<ObjectId> = series.members().to_vec();
    for member in members.iter().filter(|m| *m != pwc_id) {
        let entry = state.require_mut(member)?;
        set_checked_out_flags(entry, None);
        entry.set_value(props::IS_LATEST_VERSION, Some(Value::boolean(false)));
        if major {
            entry.set_value(props::IS_LATEST_MAJOR_VERSION, Some(Value::boolean(false)));
        }
    }

    let entry = state.require_mut(pwc_id)?;
    set_checked_out_flags(entry, None);
    set_version_flags(entry, label, major, major);
    entry.set_value(props::CHECKIN_COMMENT, comment.map(Value::string));

    info!(document = %pwc_id, series = %series_id, label = %label, major, "checked in");
    Ok(())
}

/// Discard the private working copy of the series containing `doc_id`.
///
/// A no-op when the series is not checked out. A series that was created
/// checked out has no other members and disappears with its PWC. Refused
/// while the PWC is the source or target of a relationship.
pub(crate) fn cancel_checkout(state: &mut StoreState, doc_id: &ObjectId) -> RepoResult<()> {
    let series_id = series_id_of(state, doc_id)?;
    let Some(pwc) = state.series_mut(&series_id)?.checked_out().cloned() else {
        return Ok(());
    };
    crate::integrity::check_not_endpoint(state, &pwc)?;
    state.remove(&pwc)?;

    if let Some(series) = state.series(&series_id) {
        let members: Vec<ObjectId> = series.members().to_vec();
        for member in &members {
            set_checked_out_flags(state.require_mut(member)?, None);
        }
    }

    info!(pwc = %pwc, series = %series_id, "cancelled checkout");
    Ok(())
}

/// Every version of a series: the PWC first, then checked-in versions
/// newest first.
pub(crate) fn all_versions(
    state: &StoreState,
    series_id: &VersionSeriesId,
) -> RepoResult<Vec<ObjectId>> {
    let series = state
        .series(series_id)
        .ok_or_else(|| RepoError::ObjectNotFound(format!("version series {series_id}")))?;
    Ok(series
        .checked_out()
        .into_iter()
        .chain(series.checked_in())
        .cloned()
        .collect())
}

/// Fail unless `id` is the private working copy of its series.
pub(crate) fn require_pwc(state: &StoreState, id: &ObjectId) -> RepoResult<VersionSeriesId> {
    let series_id = series_id_of(state, id)?;
    if !is_pwc(state, id) {
        return Err(RepoError::constraint(format!(
            "{id} is not a private working copy"
        )));
    }
    Ok(series_id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn create(state: &mut StoreState, vs: VersioningState) -> ObjectId {
        let mut e = Entry::new(BaseType::Document, "cmis:document");
        e.set_value(props::NAME, Some(Value::string("doc")));
        let series_id = start_series(&mut e, vs, "alice");
        let id = state.insert(e).unwrap();
        register_member(state, &series_id, &id, vs == VersioningState::CheckedOut).unwrap();
        id
    }

    fn label(state: &StoreState, id: &ObjectId) -> String {
        state.entry(id).unwrap().string(props::VERSION_LABEL).unwrap().to_string()
    }

    fn flag(state: &StoreState, id: &ObjectId, p: &str) -> bool {
        state.entry(id).unwrap().flag(p)
    }

    #[test]
    fn label_parse_and_next() {
        let l = VersionLabel::parse("2.3").unwrap();
        assert_eq!(l.next(true).to_string(), "3.0");
        assert_eq!(l.next(false).to_string(), "2.4");
        assert!(VersionLabel::parse("pwc").is_none());
        assert_eq!(VersionLabel::first(false).to_string(), "0.1");
    }

    #[test]
    fn new_series_flags() {
        let mut s = StoreState::default();
        let major = create(&mut s, VersioningState::Major);
        assert_eq!(label(&s, &major), "1.0");
        assert!(flag(&s, &major, props::IS_LATEST_VERSION));
        assert!(flag(&s, &major, props::IS_LATEST_MAJOR_VERSION));

        let minor = create(&mut s, VersioningState::Minor);
        assert_eq!(label(&s, &minor), "0.1");
        assert!(!flag(&s, &minor, props::IS_MAJOR_VERSION));
        assert!(!flag(&s, &minor, props::IS_LATEST_MAJOR_VERSION));
    }

    #[test]
    fn checkout_marks_every_member() {
        let mut s = StoreState::default();
        let v1 = create(&mut s, VersioningState::Major);
        let pwc = checkout(&mut s, &v1, "bob").unwrap();

        assert!(is_pwc(&s, &pwc));
        assert_eq!(label(&s, &pwc), PWC_LABEL);
        for id in [&v1, &pwc] {
            let e = s.entry(id).unwrap();
            assert!(e.flag(props::IS_VERSION_SERIES_CHECKED_OUT));
            assert_eq!(e.string(props::VERSION_SERIES_CHECKED_OUT_BY), Some("bob"));
            assert_eq!(e.string(props::VERSION_SERIES_CHECKED_OUT_ID), Some(pwc.as_str()));
        }
    }

    #[test]
    fn second_checkout_is_versioning_error() {
        let mut s = StoreState::default();
        let v1 = create(&mut s, VersioningState::Major);
        checkout(&mut s, &v1, "bob").unwrap();
        let err = checkout(&mut s, &v1, "carol").unwrap_err();
        assert!(matches!(err, RepoError::Versioning(_)));
    }

    #[test]
    fn checkin_promotes_pwc() {
        let mut s = StoreState::default();
        let v1 = create(&mut s, VersioningState::Major);
        let pwc = checkout(&mut s, &v1, "bob").unwrap();
        checkin(&mut s, &pwc, false, Some("tweak")).unwrap();

        assert_eq!(label(&s, &pwc), "1.1");
        assert!(flag(&s, &pwc, props::IS_LATEST_VERSION));
        assert!(!flag(&s, &pwc, props::IS_LATEST_MAJOR_VERSION));
        assert!(!flag(&s, &v1, props::IS_LATEST_VERSION));
        assert!(flag(&s, &v1, props::IS_LATEST_MAJOR_VERSION));
        assert_eq!(
            s.entry(&pwc).unwrap().string(props::CHECKIN_COMMENT),
            Some("tweak")
        );
        assert!(!flag(&s, &v1, props::IS_VERSION_SERIES_CHECKED_OUT));
        assert!(!is_pwc(&s, &pwc));

        let pwc2 = checkout(&mut s, &pwc, "bob").unwrap();
        checkin(&mut s, &pwc2, true, None).unwrap();
        assert_eq!(label(&s, &pwc2), "2.0");
        assert!(!flag(&s, &v1, props::IS_LATEST_MAJOR_VERSION));
        assert!(flag(&s, &pwc2, props::IS_LATEST_MAJOR_VERSION));
    }

    #[test]
    fn checkin_of_non_pwc_is_constraint() {
        let mut s = StoreState::default();
        let v1 = create(&mut s, VersioningState::Major);
        let err = checkin(&mut s, &v1, true, None).unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
    }

    #[test]
    fn cancel_restores_pre_checkout_state() {
        let mut s = StoreState::default();
        let v1 = create(&mut s, VersioningState::Major);
        let before = s.entry(&v1).unwrap().clone();
        let members_before = s.series_of(&v1).unwrap().members().to_vec();

        checkout(&mut s, &v1, "bob").unwrap();
        cancel_checkout(&mut s, &v1).unwrap();

        assert_eq!(s.entry(&v1).unwrap(), &before);
        assert_eq!(s.series_of(&v1).unwrap().members(), members_before.as_slice());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn cancel_without_checkout_is_noop() {
        let mut s = StoreState::default();
        let v1 = create(&mut s, VersioningState::Major);
        cancel_checkout(&mut s, &v1).unwrap();
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn cancel_is_refused_while_pwc_is_related() {
        let mut s = StoreState::default();
        let v1 = create(&mut s, VersioningState::Major);
        let other = create(&mut s, VersioningState::Major);
        let pwc = checkout(&mut s, &v1, "bob").unwrap();
        let mut rel = Entry::new(BaseType::Relationship, "cmis:relationship");
        rel.set_value(props::NAME, Some(Value::string("rel")));
        let rel = s.insert(rel).unwrap();
        s.edges_mut().link(&rel, &other, &pwc);

        let err = cancel_checkout(&mut s, &v1).unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
        assert!(is_pwc(&s, &pwc));
        assert!(flag(&s, &v1, props::IS_VERSION_SERIES_CHECKED_OUT));
    }

    #[test]
    fn created_checked_out_then_cancelled_vanishes() {
        let mut s = StoreState::default();
        let pwc = create(&mut s, VersioningState::CheckedOut);
        let series_id = series_id_of(&s, &pwc).unwrap();
        assert!(is_pwc(&s, &pwc));
        cancel_checkout(&mut s, &pwc).unwrap();
        assert!(s.is_empty());
        assert!(s.series(&series_id).is_none());
    }

    #[test]
    fn created_checked_out_first_checkin_labels() {
        let mut s = StoreState::default();
        let pwc = create(&mut s, VersioningState::CheckedOut);
        checkin(&mut s, &pwc, false, None).unwrap();
        assert_eq!(label(&s, &pwc), "0.1");
    }

    #[test]
    fn all_versions_pwc_first_then_newest() {
        let mut s = StoreState::default();
        let v1 = create(&mut s, VersioningState::Major);
        let v2 = checkout(&mut s, &v1, "bob").unwrap();
        checkin(&mut s, &v2, true, None).unwrap();
        let pwc = checkout(&mut s, &v2, "bob").unwrap();
        let sid = series_id_of(&s, &v1).unwrap();
        assert_eq!(all_versions(&s, &sid).unwrap(), vec![pwc, v2, v1]);
    }

    #[test]
    fn elect_latest_after_removal() {
        let mut s = StoreState::default();
        let v1 = create(&mut s, VersioningState::Major);
        let v2 = checkout(&mut s, &v1, "bob").unwrap();
        checkin(&mut s, &v2, false, None).unwrap();
        let sid = series_id_of(&s, &v1).unwrap();
        s.remove(&v2).unwrap();
        elect_latest(&mut s, &sid).unwrap();
        assert!(flag(&s, &v1, props::IS_LATEST_VERSION));
        assert!(flag(&s, &v1, props::IS_LATEST_MAJOR_VERSION));
    }
}
