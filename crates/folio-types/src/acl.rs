//! Access control lists and their merge algebra.
//!
//! An [`Acl`] maps a principal id to a set of [`Permission`]s. `All` is
//! absorbing: a principal holding `All` holds nothing else.
//!
//! Merging an add-set and a remove-set into an existing ACL always applies
//! the additions first, then the removals. Removing `Read` or `Write` from a
//! principal holding `All` first expands `All` into `{Read, Write}`, so
//! removing `Read` leaves exactly `{Write}`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A basic permission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "cmis:read")]
    Read,
    #[serde(rename = "cmis:write")]
    Write,
    #[serde(rename = "cmis:all")]
    All,
}

impl Permission {
    pub fn token(&self) -> &'static str {
        match self {
            Permission::Read => "cmis:read",
            Permission::Write => "cmis:write",
            Permission::All => "cmis:all",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Permission {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cmis:read" => Ok(Permission::Read),
            "cmis:write" => Ok(Permission::Write),
            "cmis:all" => Ok(Permission::All),
            other => Err(TypeError::UnknownPermission(other.to_string())),
        }
    }
}

/// Principal id to permission set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Acl {
    entries: BTreeMap<String, BTreeSet<Permission>>,
}

impl Acl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Acl::add`].
    pub fn grant<I>(mut self, principal: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        let set: BTreeSet<Permission> = permissions.into_iter().collect();
        self.add(&principal.into(), &set);
        self
    }

    /// Parse `(principal, [token, ...])` pairs, rejecting unknown tokens.
    pub fn from_tokens<'a, I, P>(entries: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = (&'a str, P)>,
        P: IntoIterator<Item = &'a str>,
    {
        let mut acl = Acl::new();
        for (principal, tokens) in entries {
            let perms = tokens
                .into_iter()
                .map(str::parse)
                .collect::<Result<BTreeSet<Permission>, _>>()?;
            acl.add(principal, &perms);
        }
        Ok(acl)
    }

    pub fn permissions(&self, principal: &str) -> Option<&BTreeSet<Permission>> {
        self.entries.get(principal)
    }

    /// Whether `principal` holds `permission`, counting `All` as both.
    pub fn allows(&self, principal: &str, permission: Permission) -> bool {
        self.entries
            .get(principal)
            .map(|p| p.contains(&permission) || p.contains(&Permission::All))
            .unwrap_or(false)
    }

    pub fn principals(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<Permission>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union `permissions` into the principal's set. Granting `All` replaces
    /// whatever the principal held.
    pub fn add(&mut self, principal: &str, permissions: &BTreeSet<Permission>) {
        if permissions.is_empty() {
            return;
        }
        let current = self.entries.entry(principal.to_string()).or_default();
        if permissions.contains(&Permission::All) || current.contains(&Permission::All) {
            current.clear();
            current.insert(Permission::All);
        } else {
            current.extend(permissions.iter().copied());
        }
    }

    /// Subtract `permissions` from the principal's set, deleting the entry
    /// when nothing remains. Revoking `All` always deletes the entry.
    pub fn remove(&mut self, principal: &str, permissions: &BTreeSet<Permission>) {
        if permissions.contains(&Permission::All) {
            self.entries.remove(principal);
            return;
        }
        let Some(current) = self.entries.get_mut(principal) else {
            return;
        };
        if current.remove(&Permission::All) {
            current.insert(Permission::Read);
            current.insert(Permission::Write);
        }
        for p in permissions {
            current.remove(p);
        }
        if current.is_empty() {
            self.entries.remove(principal);
        }
    }

    /// Apply every entry of `add`, then every entry of `remove`.
    pub fn merge(&mut self, add: &Acl, remove: &Acl) {
        for (principal, perms) in &add.entries {
            self.add(principal, perms);
        }
        for (principal, perms) in &remove.entries {
            self.remove(principal, perms);
        }
    }

    /// Non-mutating form of [`Acl::merge`].
    pub fn merged(&self, add: &Acl, remove: &Acl) -> Acl {
        let mut out = self.clone();
        out.merge(add, remove);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(perms: &[Permission]) -> BTreeSet<Permission> {
        perms.iter().copied().collect()
    }

    #[test]
    fn add_all_then_remove_read_leaves_write() {
        let mut acl = Acl::new();
        acl.merge(
            &Acl::new().grant("alice", [Permission::All]),
            &Acl::new().grant("alice", [Permission::Read]),
        );
        assert_eq!(acl.permissions("alice"), Some(&set(&[Permission::Write])));
    }

    #[test]
    fn remove_write_from_all_leaves_read() {
        let mut acl = Acl::new().grant("bob", [Permission::All]);
        acl.remove("bob", &set(&[Permission::Write]));
        assert_eq!(acl.permissions("bob"), Some(&set(&[Permission::Read])));
    }

    #[test]
    fn remove_all_deletes_principal() {
        let mut acl = Acl::new().grant("carol", [Permission::Read, Permission::Write]);
        acl.remove("carol", &set(&[Permission::All]));
        assert!(acl.permissions("carol").is_none());
        assert!(acl.is_empty());
    }

    #[test]
    fn all_absorbs_later_grants() {
        let mut acl = Acl::new().grant("dave", [Permission::All]);
        acl.add("dave", &set(&[Permission::Read]));
        assert_eq!(acl.permissions("dave"), Some(&set(&[Permission::All])));
    }

    #[test]
    fn add_is_applied_before_remove() {
        // The same permission in both sets ends up removed.
        let mut acl = Acl::new();
        acl.merge(
            &Acl::new().grant("erin", [Permission::Read]),
            &Acl::new().grant("erin", [Permission::Read]),
        );
        assert!(acl.permissions("erin").is_none());
    }

    #[test]
    fn removing_last_permission_deletes_entry() {
        let mut acl = Acl::new().grant("frank", [Permission::Read]);
        acl.remove("frank", &set(&[Permission::Read]));
        assert!(acl.is_empty());
    }

    #[test]
    fn remove_for_unknown_principal_is_noop() {
        let mut acl = Acl::new().grant("gina", [Permission::Read]);
        acl.remove("nobody", &set(&[Permission::Read]));
        assert_eq!(acl.len(), 1);
    }

    #[test]
    fn allows_counts_all_as_read_and_write() {
        let acl = Acl::new().grant("hank", [Permission::All]);
        assert!(acl.allows("hank", Permission::Read));
        assert!(acl.allows("hank", Permission::Write));
        assert!(!acl.allows("ivy", Permission::Read));
    }

    #[test]
    fn from_tokens_rejects_unknown_permission() {
        let err = Acl::from_tokens([("jo", vec!["cmis:read", "cmis:delete"])]).unwrap_err();
        assert_eq!(err, TypeError::UnknownPermission("cmis:delete".into()));
        let ok = Acl::from_tokens([("jo", vec!["cmis:read"])]).unwrap();
        assert!(ok.allows("jo", Permission::Read));
    }

    fn permission() -> impl Strategy<Value = Permission> {
        prop_oneof![
            Just(Permission::Read),
            Just(Permission::Write),
            Just(Permission::All)
        ]
    }

    fn permission_set() -> impl Strategy<Value = BTreeSet<Permission>> {
        prop::collection::btree_set(permission(), 0..3)
    }

    proptest! {
        #[test]
        fn all_is_never_mixed_with_other_permissions(
            start in permission_set(),
            add in permission_set(),
            remove in permission_set(),
        ) {
            let mut acl = Acl::new();
            acl.add("p", &start);
            acl.merge(
                &Acl { entries: [("p".to_string(), add)].into_iter().collect() },
                &Acl { entries: [("p".to_string(), remove)].into_iter().collect() },
            );
            if let Some(perms) = acl.permissions("p") {
                prop_assert!(!perms.is_empty());
                prop_assert!(!perms.contains(&Permission::All) || perms.len() == 1);
            }
        }

        #[test]
        fn revoking_all_always_deletes(start in permission_set(), add in permission_set()) {
            let mut acl = Acl::new();
            acl.add("p", &start);
            acl.merge(
                &Acl { entries: [("p".to_string(), add)].into_iter().collect() },
                &Acl::new().grant("p", [Permission::All]),
            );
            prop_assert!(acl.permissions("p").is_none());
        }

        #[test]
        fn removed_permissions_are_not_allowed_afterwards(
            start in permission_set(),
            remove in prop::collection::btree_set(
                prop_oneof![Just(Permission::Read), Just(Permission::Write)], 1..3),
        ) {
            let mut acl = Acl::new();
            acl.add("p", &start);
            acl.remove("p", &remove);
            for perm in &remove {
                prop_assert!(!acl.allows("p", *perm));
            }
        }
    }
}
