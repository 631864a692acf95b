//! Comparison of publication compositions
//!
//! [`compare`] works on desired compositions only. [`diff_report`] adds the
//! package-level changes between the resolved snapshots, for display before
//! a promotion.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use aptpub_client::{AptlyApi, SnapshotDiffEntry};
use aptpub_core::{Composition, DebVersion, PackageRef};

use crate::error::Result;
use crate::publication::Publication;

/// Per-component difference between two compositions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comparison {
    /// Sources of the left side that the right side lacks
    pub diff: BTreeMap<String, Vec<String>>,
    /// Sources both sides share
    pub equal: BTreeMap<String, Vec<String>>,
}

impl Comparison {
    /// No difference at all
    pub fn is_empty(&self) -> bool {
        self.diff.is_empty()
    }
}

/// Compare the desired compositions of two publications
///
/// Empty `components` selects every component of `source`.
pub fn compare(source: &Publication, target: &Publication, components: &[String]) -> Comparison {
    compare_compositions(source.desired(), target.desired(), components)
}

pub fn compare_compositions(
    left: &Composition,
    right: &Composition,
    components: &[String],
) -> Comparison {
    let mut comparison = Comparison::default();

    for (component, sources) in left.iter() {
        if !components.is_empty() && !components.iter().any(|c| c == component) {
            continue;
        }
        let ours: BTreeSet<&String> = sources.iter().collect();

        let Some(theirs) = right.get(component) else {
            comparison
                .diff
                .insert(component.to_string(), ours.into_iter().cloned().collect());
            continue;
        };
        let theirs: BTreeSet<&String> = theirs.iter().collect();

        let diff: Vec<String> = ours.difference(&theirs).map(|s| s.to_string()).collect();
        let equal: Vec<String> = ours.intersection(&theirs).map(|s| s.to_string()).collect();
        if !diff.is_empty() {
            comparison.diff.insert(component.to_string(), diff);
        }
        if !equal.is_empty() {
            comparison.equal.insert(component.to_string(), equal);
        }
    }

    comparison
}

/// Kind of change of one package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Upgraded,
    Downgraded,
    /// Same version, different content
    Rebuilt,
}

/// One package that differs between target and source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageChange {
    pub name: String,
    pub arch: String,
    /// Version in the target
    pub old: Option<String>,
    /// Version in the source
    pub new: Option<String>,
}

impl PackageChange {
    /// Build a change from one diff line, `left` being the target
    ///
    /// Returns `None` when neither side is a valid package key.
    pub fn from_entry(entry: &SnapshotDiffEntry) -> Option<Self> {
        let parse = |side: &Option<String>| side.as_deref().and_then(|s| PackageRef::parse(s).ok());
        let old = parse(&entry.left);
        let new = parse(&entry.right);
        let named = old.as_ref().or(new.as_ref())?;

        Some(Self {
            name: named.name().to_string(),
            arch: named.arch().to_string(),
            old: old.as_ref().map(|r| r.version().to_string()),
            new: new.as_ref().map(|r| r.version().to_string()),
        })
    }

    pub fn kind(&self) -> ChangeKind {
        match (&self.old, &self.new) {
            (None, _) => ChangeKind::Added,
            (_, None) => ChangeKind::Removed,
            (Some(old), Some(new)) => {
                match (DebVersion::parse(old), DebVersion::parse(new)) {
                    (Ok(old), Ok(new)) if new > old => ChangeKind::Upgraded,
                    (Ok(old), Ok(new)) if new < old => ChangeKind::Downgraded,
                    _ if old == new => ChangeKind::Rebuilt,
                    _ if new > old => ChangeKind::Upgraded,
                    _ => ChangeKind::Downgraded,
                }
            }
        }
    }
}

/// Differences of one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentReport {
    pub component: String,
    /// Snapshot the source publishes
    pub source_snapshot: Option<String>,
    /// Snapshot the target publishes
    pub target_snapshot: Option<String>,
    /// Source snapshots the target lacks
    pub snapshots: Vec<String>,
    pub packages: Vec<PackageChange>,
}

/// Human-oriented report of what promoting `source` onto `target` changes
pub async fn diff_report(
    api: &dyn AptlyApi,
    source: &Publication,
    target: &Publication,
    components: &[String],
) -> Result<Vec<ComponentReport>> {
    let comparison = compare(source, target, components);
    let mut reports = Vec::new();

    for (component, snapshots) in comparison.diff {
        let source_snapshot = resolved_name(source, &component);
        let target_snapshot = resolved_name(target, &component);

        let packages = match (&source_snapshot, &target_snapshot) {
            (Some(src), Some(dst)) => api
                .snapshot_diff(dst, src)
                .await?
                .iter()
                .filter_map(|entry| {
                    let change = PackageChange::from_entry(entry);
                    if change.is_none() {
                        tracing::debug!("Skipping unparsable diff entry {:?}", entry);
                    }
                    change
                })
                .collect(),
            (Some(src), None) => api
                .snapshot_packages(src, None)
                .await?
                .iter()
                .map(|r| PackageChange {
                    name: r.name().to_string(),
                    arch: r.arch().to_string(),
                    old: None,
                    new: Some(r.version().to_string()),
                })
                .collect(),
            _ => Vec::new(),
        };

        reports.push(ComponentReport {
            component,
            source_snapshot,
            target_snapshot,
            snapshots,
            packages,
        });
    }

    Ok(reports)
}

fn resolved_name(publication: &Publication, component: &str) -> Option<String> {
    publication
        .resolved()
        .or(publication.remote())
        .and_then(|r| r.get(component))
        .map(str::to_string)
}
