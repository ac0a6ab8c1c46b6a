//! Participants and the ordered participant set.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A participant, identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Participant(String);

impl Participant {
    /// Validated constructor: the name is trimmed and must not be empty.
    pub fn new(name: impl AsRef<str>) -> DomainResult<Self> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(DomainError::validation("participant name cannot be empty"));
        }
        Ok(Self(name.to_string()))
    }

    /// Lenient constructor for externally-sourced data: trims but accepts an
    /// empty name.
    pub fn lenient(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Display for Participant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Insertion-ordered set of participants.
///
/// Iteration order is the order of first insertion; it drives deterministic
/// balance output and tie-breaking in the settlement planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Participant>", into = "Vec<Participant>")]
pub struct ParticipantSet {
    order: Vec<Participant>,
    members: HashSet<Participant>,
}

impl ParticipantSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, participant: &Participant) -> bool {
        self.members.contains(participant)
    }

    /// Insert at the end. Returns `false` if already present (order unchanged).
    pub fn insert(&mut self, participant: Participant) -> bool {
        if self.members.contains(&participant) {
            return false;
        }
        self.members.insert(participant.clone());
        self.order.push(participant);
        true
    }

    /// Remove a member. Returns `false` if it was not present.
    pub fn remove(&mut self, participant: &Participant) -> bool {
        if !self.members.remove(participant) {
            return false;
        }
        self.order.retain(|p| p != participant);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.order.iter()
    }

    pub fn as_slice(&self) -> &[Participant] {
        &self.order
    }
}

impl From<Vec<Participant>> for ParticipantSet {
    fn from(value: Vec<Participant>) -> Self {
        value.into_iter().collect()
    }
}

impl From<ParticipantSet> for Vec<Participant> {
    fn from(value: ParticipantSet) -> Self {
        value.order
    }
}

impl FromIterator<Participant> for ParticipantSet {
    fn from_iter<I: IntoIterator<Item = Participant>>(iter: I) -> Self {
        let mut set = ParticipantSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<Participant> for ParticipantSet {
    fn extend<I: IntoIterator<Item = Participant>>(&mut self, iter: I) {
        for participant in iter {
            self.insert(participant);
        }
    }
}

impl<'a> IntoIterator for &'a ParticipantSet {
    type Item = &'a Participant;
    type IntoIter = core::slice::Iter<'a, Participant>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}
