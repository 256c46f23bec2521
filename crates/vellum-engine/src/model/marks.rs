//! Inline marks and mark sets.
//!
//! A [`Mark`] is plain data: a name, the authority that owns it, and a bag of
//! attributes. Two marks with the same `(name, authority)` are the same mark
//! as far as a [`MarkSet`] is concerned, whatever their attributes; adding
//! one replaces the other.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

use super::node::Attributes;

/// Authority of marks created without one.
pub const CORE_AUTHORITY: &str = "core";

/// Identity of a mark inside a [`MarkSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkKey {
    pub name: String,
    pub authority: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    pub name: String,
    #[serde(default = "core_authority")]
    pub authority: String,
    #[serde(default)]
    pub attributes: Attributes,
}

fn core_authority() -> String {
    CORE_AUTHORITY.to_string()
}

impl Mark {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            authority: core_authority(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn key(&self) -> MarkKey {
        MarkKey {
            name: self.name.clone(),
            authority: self.authority.clone(),
        }
    }
}

/// Whether a mark step adds or removes its mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkAction {
    Add,
    Remove,
}

impl MarkAction {
    pub fn apply(self, marks: &MarkSet, mark: &Mark) -> MarkSet {
        let mut marks = marks.clone();
        match self {
            MarkAction::Add => marks.insert(mark.clone()),
            MarkAction::Remove => marks.remove(&mark.key()),
        }
        marks
    }
}

/// A deduplicated, ordered set of marks.
///
/// Iteration order is by `(name, authority)`, which is also the nesting
/// order used when marks are rendered as wrapper tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkSet(BTreeMap<MarkKey, Mark>);

impl MarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mark: Mark) {
        self.0.insert(mark.key(), mark);
    }

    pub fn remove(&mut self, key: &MarkKey) {
        self.0.remove(key);
    }

    pub fn with(mut self, mark: Mark) -> Self {
        self.insert(mark);
        self
    }

    pub fn contains(&self, key: &MarkKey) -> bool {
        self.0.contains_key(key)
    }

    /// True if any mark with this name is present, whatever its authority.
    pub fn has(&self, name: &str) -> bool {
        self.0.keys().any(|key| key.name == name)
    }

    pub fn get(&self, key: &MarkKey) -> Option<&Mark> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Mark> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Marks in either set. On a key clash `self` wins.
    pub fn union(&self, other: &MarkSet) -> MarkSet {
        let mut result = other.clone();
        for mark in self.iter() {
            result.insert(mark.clone());
        }
        result
    }

    pub fn intersection(&self, other: &MarkSet) -> MarkSet {
        self.iter()
            .filter(|mark| other.contains(&mark.key()))
            .cloned()
            .collect()
    }

    pub fn difference(&self, other: &MarkSet) -> MarkSet {
        self.iter()
            .filter(|mark| !other.contains(&mark.key()))
            .cloned()
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|mark| mark.name.as_str()).collect()
    }
}

impl FromIterator<Mark> for MarkSet {
    fn from_iter<I: IntoIterator<Item = Mark>>(iter: I) -> Self {
        let mut set = MarkSet::new();
        for mark in iter {
            set.insert(mark);
        }
        set
    }
}

impl Serialize for MarkSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.values())
    }
}
