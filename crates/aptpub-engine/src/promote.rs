//! Promotion of components or packages between publications

use std::collections::BTreeMap;

use aptpub_client::{AptlyApi, CreateSnapshotRequest, PackageQuery};
use aptpub_core::{PackageRef, PublicationId, SourceProvenance};

use crate::compare::compare;
use crate::error::{EngineError, Result};
use crate::merge::merge;
use crate::publication::Publication;
use crate::reconcile::{reconcile, ReconcileOutcome, ReconcilePolicy};

/// Copy whole components from `source` into `target`
///
/// With no components listed, the target's composition becomes a copy of
/// the source's. Every listed component must exist in the source.
pub fn promote_components(
    source: &Publication,
    target: &mut Publication,
    components: &[String],
) -> Result<()> {
    if components.is_empty() {
        target.set_desired(source.desired().clone());
        return Ok(());
    }

    if let Some(missing) = components.iter().find(|c| !source.desired().contains(c)) {
        return Err(EngineError::component_not_found(missing, source.full_name()));
    }

    let mut desired = target.desired().clone();
    for component in components {
        if let Some(sources) = source.desired().get(component) {
            desired.replace(component.as_str(), sources.to_vec());
        }
    }
    target.set_desired(desired);
    Ok(())
}

/// Copy selected packages from `source` into `target`
///
/// For each component with matches, a snapshot `ext_{component}-{timestamp}`
/// holding exactly the matching packages is created and appended to the
/// target's sources. Nothing is created unless at least one package matched.
/// Returns the created snapshot names.
pub async fn promote_packages(
    api: &dyn AptlyApi,
    source: &Publication,
    target: &mut Publication,
    components: &[String],
    packages: &[String],
    timestamp: i64,
) -> Result<Vec<String>> {
    let resolved = source.require_resolved()?;
    let selected: Vec<String> = if components.is_empty() {
        resolved.components().map(str::to_string).collect()
    } else {
        components.to_vec()
    };
    let query = PackageQuery::names(packages.iter().cloned());

    let mut found: BTreeMap<String, (String, Vec<PackageRef>)> = BTreeMap::new();
    for component in &selected {
        let snapshot = resolved
            .get(component)
            .ok_or_else(|| EngineError::component_not_found(component, source.full_name()))?;
        let refs = api.snapshot_packages(snapshot, Some(&query)).await?;
        tracing::debug!(
            "{}: {} matching packages in {}",
            component,
            refs.len(),
            snapshot
        );
        if !refs.is_empty() {
            found.insert(component.clone(), (snapshot.to_string(), refs));
        }
    }

    if found.is_empty() {
        return Err(EngineError::NoPackagesPromoted {
            packages: quoted(packages),
            source_name: source.full_name(),
            components: selected.join(", "),
        });
    }

    let mut created = Vec::new();
    let mut desired = target.desired().clone();
    for (component, (snapshot, refs)) in found {
        let name = format!("ext_{}-{}", component, timestamp);
        let request = CreateSnapshotRequest {
            name: name.clone(),
            description: format!(
                "Promoted packages {} from snapshots {}",
                quoted(packages),
                quoted(std::slice::from_ref(&snapshot))
            ),
            source_snapshots: vec![snapshot],
            package_refs: refs,
        };
        tracing::info!(
            "{}: promoting {} packages into {}",
            target.full_name(),
            request.package_refs.len(),
            name
        );
        match api.create_snapshot(&request).await {
            Ok(()) => {}
            Err(e) if e.is_conflict() => {
                tracing::info!("Snapshot {} already exists: {}", name, e);
            }
            Err(e) => return Err(e.into()),
        }
        desired.add(component, name.clone());
        created.push(name);
    }
    target.set_desired(desired);

    Ok(created)
}

fn quoted(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("'{}'", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parameters of one promotion
#[derive(Debug, Clone)]
pub struct PromoteRequest {
    pub source: PublicationId,
    pub target: PublicationId,
    /// Components to promote, all when empty
    pub components: Vec<String>,
    /// Package allow-list; whole components are promoted when empty
    pub packages: Vec<String>,
    pub policy: ReconcilePolicy,
}

/// Result of a promotion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoteOutcome {
    /// Target already carries everything the source has
    UpToDate,
    Promoted(ReconcileOutcome),
}

/// Load both sides, promote, merge and publish the target
///
/// The source must exist; a missing target is created.
pub async fn promote(
    api: &dyn AptlyApi,
    request: &PromoteRequest,
    timestamp: i64,
    provenance: &dyn SourceProvenance,
) -> Result<PromoteOutcome> {
    let source = Publication::load(api, &request.source, timestamp, provenance).await?;
    let mut target = match Publication::load(api, &request.target, timestamp, provenance).await {
        Ok(target) => target,
        Err(EngineError::NoSuchPublication { name }) => {
            tracing::info!("Target publication {} does not exist yet", name);
            Publication::new(request.target.clone(), timestamp)
                .with_architectures(source.architectures().to_vec())
        }
        Err(e) => return Err(e),
    };

    if compare(&source, &target, &request.components).is_empty() && !request.policy.recreate {
        tracing::info!(
            "{} is up to date with {}",
            target.full_name(),
            source.full_name()
        );
        return Ok(PromoteOutcome::UpToDate);
    }

    if request.packages.is_empty() {
        promote_components(&source, &mut target, &request.components)?;
    } else {
        promote_packages(
            api,
            &source,
            &mut target,
            &request.components,
            &request.packages,
            timestamp,
        )
        .await?;
    }

    let resolved = merge(api, &target, provenance).await?;
    target.set_resolved(resolved);
    let outcome = reconcile(api, &mut target, &request.policy).await?;
    Ok(PromoteOutcome::Promoted(outcome))
}
