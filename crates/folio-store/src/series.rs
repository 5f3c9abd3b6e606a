use folio_types::{ObjectId, VersionSeriesId};

/// Membership record for one version series.
///
/// Members are kept in creation order (oldest first). At most one member is
/// the private working copy; its id is `checked_out`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionSeries {
    id: VersionSeriesId,
    members: Vec<ObjectId>,
    checked_out: Option<ObjectId>,
}

impl VersionSeries {
    pub fn new(id: VersionSeriesId) -> Self {
        Self {
            id,
            members: Vec::new(),
            checked_out: None,
        }
    }

    pub fn id(&self) -> &VersionSeriesId {
        &self.id
    }

    /// Members, oldest first.
    pub fn members(&self) -> &[ObjectId] {
        &self.members
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.members.contains(id)
    }

    pub fn push(&mut self, id: ObjectId) {
        if !self.members.contains(&id) {
            self.members.push(id);
        }
    }

    /// Remove a member. Clears the checked-out marker if it was the PWC.
    pub fn remove(&mut self, id: &ObjectId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != id);
        if self.checked_out.as_ref() == Some(id) {
            self.checked_out = None;
        }
        self.members.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn checked_out(&self) -> Option<&ObjectId> {
        self.checked_out.as_ref()
    }

    pub fn is_checked_out(&self) -> bool {
        self.checked_out.is_some()
    }

    pub fn set_checked_out(&mut self, pwc: Option<ObjectId>) {
        self.checked_out = pwc;
    }

    /// Members other than the private working copy, newest first.
    pub fn checked_in(&self) -> impl Iterator<Item = &ObjectId> {
        self.members
            .iter()
            .rev()
            .filter(move |m| Some(*m) != self.checked_out.as_ref())
    }
}
