//! Property updates, the validated write path, and property filters.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use folio_store::Entry;
use folio_types::{props, PropertyDefinition, Updatability, Value};

use crate::error::{RepoError, RepoResult};

/// Properties the repository maintains itself. Client writes to them are
/// dropped even when the definition would allow them.
const SYSTEM_MANAGED: &[&str] = &[props::OBJECT_ID, props::BASE_TYPE_ID, props::OBJECT_TYPE_ID];

/// A batch of property writes. `None` unsets a property.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    values: BTreeMap<String, Option<Value>>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(id, Some(value.into()));
        self
    }

    /// Builder-style unset.
    pub fn without(mut self, id: impl Into<String>) -> Self {
        self.set(id, None);
        self
    }

    pub fn set(&mut self, id: impl Into<String>, value: Option<Value>) {
        self.values.insert(id.into(), value);
    }

    pub fn get(&self, id: &str) -> Option<&Option<Value>> {
        self.values.get(id)
    }

    /// The string a property would be set to, if this batch sets it.
    pub fn string(&self, id: &str) -> Option<&str> {
        self.values.get(id)?.as_ref()?.as_str()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overlay `other` on top of this batch.
    pub fn extend(&mut self, other: Properties) {
        self.values.extend(other.values);
    }
}

impl FromIterator<(String, Value)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k, Some(v))).collect(),
        }
    }
}

/// Where an entry sits in its lifecycle, for updatability decisions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct WriteContext {
    pub is_new: bool,
    pub is_pwc: bool,
}

impl WriteContext {
    pub fn creating() -> Self {
        Self {
            is_new: true,
            is_pwc: false,
        }
    }

    fn permits(&self, updatability: Updatability) -> bool {
        match updatability {
            Updatability::ReadWrite => true,
            Updatability::OnCreate => self.is_new,
            Updatability::WhenCheckedOut => self.is_pwc,
            Updatability::ReadOnly => false,
        }
    }
}

/// Validate every write in `updates` against `definitions`, then apply the
/// ones the context permits. Nothing is written unless every value is valid.
///
/// Returns the number of properties actually changed.
pub(crate) fn apply_updates(
    entry: &mut Entry,
    definitions: &BTreeMap<String, PropertyDefinition>,
    updates: &Properties,
    ctx: WriteContext,
) -> RepoResult<usize> {
    let mut accepted = Vec::with_capacity(updates.len());
    for (id, value) in updates.iter() {
        let def = definitions.get(id).ok_or_else(|| {
            RepoError::constraint(format!(
                "property {id} is not defined for type {}",
                entry.type_id()
            ))
        })?;
        if id == props::NAME {
            check_name(value)?;
        }
        def.check_value(value)?;

        if SYSTEM_MANAGED.contains(&id) || !ctx.permits(def.updatability) {
            debug!(property = id, updatability = ?def.updatability, "ignoring write to non-updatable property");
            continue;
        }
        accepted.push((id, value));
    }

    let mut changed = 0;
    for (id, value) in accepted {
        if entry.value(id) != value {
            entry.set_value(id, value.cloned());
            changed += 1;
        }
    }
    Ok(changed)
}

fn check_name(value: Option<&Value>) -> RepoResult<()> {
    match value.and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => Ok(()),
        _ => Err(RepoError::NameConstraintViolation(
            "name must not be empty".into(),
        )),
    }
}

/// Fail if any required property is absent from `entry`.
pub(crate) fn check_required(
    entry: &Entry,
    definitions: &BTreeMap<String, PropertyDefinition>,
) -> RepoResult<()> {
    for def in definitions.values().filter(|d| d.required) {
        if def.id == props::NAME && entry.name().is_none() {
            return Err(RepoError::NameConstraintViolation(
                "name must not be empty".into(),
            ));
        }
        def.check_value(entry.value(&def.id))?;
    }
    Ok(())
}

/// Stamp creation metadata on a fresh entry.
pub(crate) fn stamp_created(entry: &mut Entry, principal: &str) {
    let now = Value::date(Utc::now());
    entry.set_value(props::CREATED_BY, Some(Value::string(principal)));
    entry.set_value(props::CREATION_DATE, Some(now.clone()));
    entry.set_value(props::LAST_MODIFIED_BY, Some(Value::string(principal)));
    entry.set_value(props::LAST_MODIFICATION_DATE, Some(now));
    entry.set_value(props::CHANGE_TOKEN, Some(Value::string(new_change_token())));
}

/// Record a modification and regenerate the change token.
pub(crate) fn touch(entry: &mut Entry, principal: &str) {
    entry.set_value(props::LAST_MODIFIED_BY, Some(Value::string(principal)));
    entry.set_value(props::LAST_MODIFICATION_DATE, Some(Value::date(Utc::now())));
    entry.set_value(props::CHANGE_TOKEN, Some(Value::string(new_change_token())));
}

fn new_change_token() -> String {
    Uuid::now_v7().simple().to_string()
}

/// Compare a caller-supplied change token against the entry's current one.
pub(crate) fn check_change_token(
    entry: &Entry,
    token: Option<&str>,
    enforce: bool,
) -> RepoResult<()> {
    match token {
        Some(token) if entry.string(props::CHANGE_TOKEN) != Some(token) => {
            Err(RepoError::UpdateConflict(format!(
                "object {} has changed since change token {token} was read",
                entry.id().map(|id| id.as_str()).unwrap_or("<new>")
            )))
        }
        None if enforce => Err(RepoError::invalid("a change token is required")),
        _ => Ok(()),
    }
}

/// Selects properties by query name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PropertyFilter {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl PropertyFilter {
    /// Parse `*` or a comma-separated list of query names. A blank filter
    /// selects everything.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            return PropertyFilter::All;
        }
        PropertyFilter::Only(
            s.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn matches(&self, query_name: &str) -> bool {
        match self {
            PropertyFilter::All => true,
            PropertyFilter::Only(names) => names.contains(query_name),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::{BaseType, PropertyCatalog, PropertyType};

    fn definitions() -> BTreeMap<String, PropertyDefinition> {
        let mut defs: BTreeMap<String, PropertyDefinition> = PropertyCatalog::standard()
            .definitions_for(BaseType::Document)
            .map(|d| (d.id.clone(), d.clone()))
            .collect();
        for def in [
            PropertyDefinition::new("acme:title", PropertyType::String),
            PropertyDefinition::new("acme:tags", PropertyType::String).multi(),
            PropertyDefinition::new("acme:serial", PropertyType::Integer)
                .updatability(Updatability::OnCreate),
            PropertyDefinition::new("acme:draftNote", PropertyType::String)
                .updatability(Updatability::WhenCheckedOut),
        ] {
            defs.insert(def.id.clone(), def);
        }
        defs
    }

    fn entry() -> Entry {
        let mut e = Entry::new(BaseType::Document, "cmis:document");
        e.set_value(props::NAME, Some(Value::string("a.txt")));
        e
    }

    const UPDATE: WriteContext = WriteContext {
        is_new: false,
        is_pwc: false,
    };

    #[test]
    fn read_write_property_is_applied() {
        let mut e = entry();
        let updates = Properties::new().with("acme:title", "Report");
        let n = apply_updates(&mut e, &definitions(), &updates, UPDATE).unwrap();
        assert_eq!(n, 1);
        assert_eq!(e.string("acme:title"), Some("Report"));
    }

    #[test]
    fn undefined_property_is_constraint() {
        let mut e = entry();
        let updates = Properties::new().with("acme:nope", "x");
        let err = apply_updates(&mut e, &definitions(), &updates, UPDATE).unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
    }

    #[test]
    fn failed_batch_leaves_entry_unchanged() {
        let mut e = entry();
        let before = e.clone();
        let updates = Properties::new()
            .with("acme:title", "Report")
            .with("acme:serial", "not a number");
        let err = apply_updates(&mut e, &definitions(), &updates, UPDATE).unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
        assert_eq!(e, before);
    }

    #[test]
    fn multiple_values_for_single_property_rejected() {
        let mut e = entry();
        let updates = Properties::new().with("acme:title", Value::strings(["a", "b"]));
        assert!(apply_updates(&mut e, &definitions(), &updates, UPDATE).is_err());
        let updates = Properties::new().with("acme:tags", Value::strings(["a", "b"]));
        assert!(apply_updates(&mut e, &definitions(), &updates, UPDATE).is_ok());
    }

    #[test]
    fn empty_name_is_name_constraint() {
        let mut e = entry();
        for updates in [
            Properties::new().with(props::NAME, ""),
            Properties::new().without(props::NAME),
        ] {
            let err = apply_updates(&mut e, &definitions(), &updates, UPDATE).unwrap_err();
            assert!(matches!(err, RepoError::NameConstraintViolation(_)));
        }
        assert_eq!(e.name(), Some("a.txt"));
    }

    #[test]
    fn on_create_only_while_new() {
        let defs = definitions();
        let updates = Properties::new().with("acme:serial", 7i64);

        let mut fresh = entry();
        apply_updates(&mut fresh, &defs, &updates, WriteContext::creating()).unwrap();
        assert_eq!(fresh.value("acme:serial"), Some(&Value::integer(7)));

        let mut stored = entry();
        let n = apply_updates(&mut stored, &defs, &updates, UPDATE).unwrap();
        assert_eq!(n, 0);
        assert!(stored.value("acme:serial").is_none());
    }

    #[test]
    fn when_checked_out_only_on_pwc() {
        let defs = definitions();
        let updates = Properties::new().with("acme:draftNote", "wip");

        let mut doc = entry();
        apply_updates(&mut doc, &defs, &updates, UPDATE).unwrap();
        assert!(doc.value("acme:draftNote").is_none());

        let mut pwc = entry();
        let ctx = WriteContext {
            is_new: false,
            is_pwc: true,
        };
        apply_updates(&mut pwc, &defs, &updates, ctx).unwrap();
        assert_eq!(pwc.string("acme:draftNote"), Some("wip"));
    }

    #[test]
    fn read_only_and_system_properties_are_dropped() {
        let mut e = entry();
        let updates = Properties::new()
            .with(props::VERSION_LABEL, "9.9")
            .with(props::OBJECT_TYPE_ID, "acme:other");
        let n = apply_updates(&mut e, &definitions(), &updates, WriteContext::creating()).unwrap();
        assert_eq!(n, 0);
        assert_eq!(e.type_id(), "cmis:document");
        assert_eq!(e.string(props::OBJECT_TYPE_ID), Some("cmis:document"));
    }

    #[test]
    fn required_check_reports_missing_name() {
        let e = Entry::new(BaseType::Document, "cmis:document");
        let err = check_required(&e, &definitions()).unwrap_err();
        assert!(matches!(err, RepoError::NameConstraintViolation(_)));
        assert!(check_required(&entry(), &definitions()).is_ok());
    }

    #[test]
    fn touch_regenerates_change_token() {
        let mut e = entry();
        stamp_created(&mut e, "alice");
        let first = e.string(props::CHANGE_TOKEN).unwrap().to_string();
        touch(&mut e, "bob");
        assert_ne!(e.string(props::CHANGE_TOKEN), Some(first.as_str()));
        assert_eq!(e.string(props::CREATED_BY), Some("alice"));
        assert_eq!(e.string(props::LAST_MODIFIED_BY), Some("bob"));
    }

    #[test]
    fn change_token_checks() {
        let mut e = entry();
        stamp_created(&mut e, "alice");
        let token = e.string(props::CHANGE_TOKEN).unwrap().to_string();
        assert!(check_change_token(&e, Some(&token), true).is_ok());
        assert!(check_change_token(&e, None, false).is_ok());
        assert!(matches!(
            check_change_token(&e, Some("stale"), false),
            Err(RepoError::UpdateConflict(_))
        ));
        assert!(matches!(
            check_change_token(&e, None, true),
            Err(RepoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn filter_parsing() {
        assert_eq!(PropertyFilter::parse("*"), PropertyFilter::All);
        assert_eq!(PropertyFilter::parse("  "), PropertyFilter::All);
        let f = PropertyFilter::parse("cmis:name, cmis:objectId,");
        assert!(f.matches("cmis:name"));
        assert!(f.matches("cmis:objectId"));
        assert!(!f.matches("cmis:createdBy"));
    }
}
