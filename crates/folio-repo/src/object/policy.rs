use folio_types::{props, ObjectId, Value};

use super::{facade, ObjectCore};
use crate::error::RepoResult;

/// A policy facade.
#[derive(Clone, Debug)]
pub struct Policy {
    core: ObjectCore,
}

facade!(Policy);

impl Policy {
    pub fn policy_text(&self) -> RepoResult<Option<String>> {
        self.string(props::POLICY_TEXT)
    }

    pub fn set_policy_text(&mut self, text: &str) -> RepoResult<()> {
        self.set_property(props::POLICY_TEXT, Some(Value::string(text)))
    }

    /// Objects this policy is currently applied to.
    pub fn targets(&self) -> RepoResult<Vec<ObjectId>> {
        match self.id() {
            Some(id) => self.connection().policy_targets(id),
            None => Ok(Vec::new()),
        }
    }
}
