//! Purge to the latest version of every package
//!
//! A purged component publishes a `{snapshot}-purged` snapshot that keeps one
//! build per package name, the highest by Debian version ordering. Hard
//! purge also removes the dropped builds from the authoring repositories.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use aptpub_client::{AptlyApi, CreateSnapshotRequest};
use aptpub_core::{DebVersion, PackageRef};

use crate::error::{EngineError, Result};
use crate::publication::Publication;

/// Keep the highest version of each package name
///
/// Output follows the first appearance of each name; on equal versions the
/// earlier reference wins.
pub fn minimal_packages(refs: &[PackageRef]) -> Vec<PackageRef> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut kept: Vec<&PackageRef> = Vec::new();

    for reference in refs {
        match position.get(reference.name()) {
            Some(&i) => {
                if compare_versions(reference, kept[i]) == Ordering::Greater {
                    kept[i] = reference;
                }
            }
            None => {
                position.insert(reference.name(), kept.len());
                kept.push(reference);
            }
        }
    }

    kept.into_iter().cloned().collect()
}

/// Debian ordering, falling back to plain string order for invalid versions
fn compare_versions(a: &PackageRef, b: &PackageRef) -> Ordering {
    match (DebVersion::parse(a.version()), DebVersion::parse(b.version())) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.version().cmp(b.version()),
    }
}

/// Purge settings
#[derive(Debug, Clone, Default)]
pub struct PurgeOptions {
    /// Delete dropped packages from `source_repos`
    pub hard: bool,
    /// Authoring repositories of the purged components
    pub source_repos: Vec<String>,
}

/// What a purge did to one component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentPurge {
    pub component: String,
    /// Snapshot the component now resolves to
    pub snapshot: String,
    /// Package builds dropped from the component
    pub removed: Vec<PackageRef>,
}

impl ComponentPurge {
    pub fn changed(&self) -> bool {
        !self.removed.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub components: Vec<ComponentPurge>,
    /// `(repository, deleted builds)` of a hard purge
    pub deleted: Vec<(String, Vec<PackageRef>)>,
}

impl PurgeReport {
    pub fn changed(&self) -> bool {
        self.components.iter().any(ComponentPurge::changed)
    }
}

/// Purge components of a publication to latest versions
///
/// Empty `components` selects every component. Components whose packages
/// are already minimal are left as they are.
pub async fn purge(
    api: &dyn AptlyApi,
    publication: &mut Publication,
    components: &[String],
    options: &PurgeOptions,
) -> Result<PurgeReport> {
    let selected: Vec<String> = if components.is_empty() {
        publication.desired().components().map(str::to_string).collect()
    } else {
        components.to_vec()
    };
    if let Some(missing) = selected.iter().find(|c| !publication.desired().contains(c)) {
        return Err(EngineError::component_not_found(missing, publication.full_name()));
    }

    let mut report = PurgeReport::default();
    let mut desired = publication.desired().clone();
    let mut resolved = publication.resolved().cloned().unwrap_or_default();
    // Authoring-repo builds that must survive a hard purge
    let mut retained: BTreeSet<PackageRef> = BTreeSet::new();
    let mut purged_names: BTreeSet<String> = BTreeSet::new();

    for component in &selected {
        let sources = publication.desired().get(component).unwrap_or_default();
        let base = match (publication.resolved().and_then(|r| r.get(component)), sources) {
            (Some(name), _) => name.to_string(),
            (None, [single]) => single.clone(),
            _ => {
                return Err(EngineError::Unresolved {
                    name: publication.full_name(),
                });
            }
        };

        let mut refs = Vec::new();
        for source in sources {
            refs.extend(api.snapshot_packages(source, None).await?);
        }
        let minimal = minimal_packages(&refs);
        let kept: BTreeSet<&PackageRef> = minimal.iter().collect();
        let removed: BTreeSet<PackageRef> = refs
            .iter()
            .filter(|r| !kept.contains(r))
            .cloned()
            .collect();

        if removed.is_empty() {
            tracing::info!(
                "{}: component {} is already minimal",
                publication.full_name(),
                component
            );
            report.components.push(ComponentPurge {
                component: component.clone(),
                snapshot: base,
                removed: Vec::new(),
            });
            continue;
        }

        let name = format!("{}-purged", base);
        tracing::info!(
            "{}: purging {} packages from component {} into {}",
            publication.full_name(),
            removed.len(),
            component,
            name
        );
        let request = CreateSnapshotRequest {
            name: name.clone(),
            description: format!("Latest packages of '{}'", base),
            source_snapshots: Vec::new(),
            package_refs: minimal.clone(),
        };
        match api.create_snapshot(&request).await {
            Ok(()) => {}
            Err(e) if e.is_conflict() => {
                tracing::info!("Snapshot {} already exists: {}", name, e);
            }
            Err(e) => return Err(e.into()),
        }

        purged_names.extend(removed.iter().map(|r| r.name().to_string()));
        retained.extend(minimal);
        desired.replace(component.as_str(), vec![name.clone()]);
        resolved.insert(component.as_str(), name.as_str());
        report.components.push(ComponentPurge {
            component: component.clone(),
            snapshot: name,
            removed: removed.into_iter().collect(),
        });
    }

    if report.changed() {
        let was_resolved = publication.resolved().is_some();
        publication.set_desired(desired);
        if was_resolved {
            publication.set_resolved(resolved);
        }
    }

    if options.hard && !purged_names.is_empty() {
        for repo in &options.source_repos {
            let doomed: Vec<PackageRef> = api
                .repo_packages(repo)
                .await?
                .into_iter()
                .filter(|r| purged_names.contains(r.name()) && !retained.contains(r))
                .collect();
            if doomed.is_empty() {
                continue;
            }
            tracing::warn!(
                "Deleting {} packages from repository {}",
                doomed.len(),
                repo
            );
            api.delete_repo_packages(repo, &doomed).await?;
            report.deleted.push((repo.clone(), doomed));
        }
    }

    Ok(report)
}
