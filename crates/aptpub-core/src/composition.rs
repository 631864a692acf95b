//! Publication composition state
//!
//! A publication carries three views of its components:
//! - the **desired** composition (component → source snapshots, possibly several),
//! - the **resolved** sources (component → the one snapshot to publish),
//! - the **remote** sources (component → the snapshot currently published).
//!
//! Each view is a value: operations build a new one instead of editing the
//! previous one in place.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Desired composition: component → ordered source-snapshot names
///
/// Repeated entries are allowed; a component with several sources is merged
/// into one snapshot before publishing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Composition(BTreeMap<String, Vec<String>>);

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source snapshot to a component
    pub fn add(&mut self, component: impl Into<String>, snapshot: impl Into<String>) {
        self.0
            .entry(component.into())
            .or_default()
            .push(snapshot.into());
    }

    /// Replace a component's sources entirely
    pub fn replace(&mut self, component: impl Into<String>, snapshots: Vec<String>) {
        self.0.insert(component.into(), snapshots);
    }

    /// Sources of a component
    pub fn get(&self, component: &str) -> Option<&[String]> {
        self.0.get(component).map(Vec::as_slice)
    }

    pub fn contains(&self, component: &str) -> bool {
        self.0.contains_key(component)
    }

    /// Component names in sorted order
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(c, s)| (c.as_str(), s.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, Vec<String>>> for Composition {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self(map)
    }
}

impl<C: Into<String>, S: Into<String>> FromIterator<(C, S)> for Composition {
    fn from_iter<I: IntoIterator<Item = (C, S)>>(iter: I) -> Self {
        let mut composition = Self::new();
        for (component, snapshot) in iter {
            composition.add(component, snapshot);
        }
        composition
    }
}

/// One snapshot per component, either to be published or already published
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedSources(BTreeMap<String, String>);

impl ResolvedSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, component: impl Into<String>, snapshot: impl Into<String>) {
        self.0.insert(component.into(), snapshot.into());
    }

    pub fn get(&self, component: &str) -> Option<&str> {
        self.0.get(component).map(String::as_str)
    }

    pub fn contains(&self, component: &str) -> bool {
        self.0.contains_key(component)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(c, s)| (c.as_str(), s.as_str()))
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `{(component, snapshot)}` pairs
    pub fn pairs(&self) -> BTreeSet<(&str, &str)> {
        self.iter().collect()
    }

    /// Whether both sides publish the same snapshot for the same components
    pub fn same_as(&self, other: &ResolvedSources) -> bool {
        self.pairs() == other.pairs()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<C: Into<String>, S: Into<String>> FromIterator<(C, S)> for ResolvedSources {
    fn from_iter<I: IntoIterator<Item = (C, S)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(c, s)| (c.into(), s.into()))
                .collect(),
        )
    }
}
