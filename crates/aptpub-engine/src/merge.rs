//! Merge engine
//!
//! Turns every component of a desired composition into a single snapshot.
//! Single-source components publish their source as is. Multi-source
//! components get a merge snapshot named `_{publication}-{component}-{ts}`
//! that records its sources in its description; an existing merge with the
//! same source set is reused instead of creating a new one.

use regex::Regex;

use aptpub_client::{AptlyApi, CreateSnapshotRequest, Snapshot};
use aptpub_core::{PublicationId, ResolvedSources, SourceProvenance};

use crate::error::{EngineError, Result};
use crate::publication::Publication;

/// Deterministic name prefix of a component's merge snapshots
pub fn merge_prefix(id: &PublicationId, component: &str) -> String {
    format!("_{}-{}", id.slug(), component)
}

/// Compute the resolved sources of a publication
///
/// The publication is left untouched; install the result with
/// [`Publication::set_resolved`].
pub async fn merge(
    api: &dyn AptlyApi,
    publication: &Publication,
    provenance: &dyn SourceProvenance,
) -> Result<ResolvedSources> {
    let mut resolved = ResolvedSources::new();
    // Listed once, on the first multi-source component
    let mut snapshots: Option<Vec<Snapshot>> = None;

    for (component, sources) in publication.desired().iter() {
        match sources {
            [] => {
                tracing::warn!(
                    "{}: component {} has no sources, skipping",
                    publication.full_name(),
                    component
                );
            }
            [single] => {
                resolved.insert(component, single.as_str());
            }
            _ => {
                if snapshots.is_none() {
                    snapshots = Some(api.list_snapshots().await?);
                }
                let existing = snapshots.as_deref().unwrap_or_default();
                let name =
                    merge_component(api, publication, component, sources, existing, provenance)
                        .await?;
                resolved.insert(component, name);
            }
        }
    }

    Ok(resolved)
}

/// Merge one component, returning the snapshot to publish
async fn merge_component(
    api: &dyn AptlyApi,
    publication: &Publication,
    component: &str,
    sources: &[String],
    existing: &[Snapshot],
    provenance: &dyn SourceProvenance,
) -> Result<String> {
    let prefix = merge_prefix(publication.id(), component);
    let mut wanted = sources.to_vec();
    wanted.sort();

    if let Some(name) = find_reusable(&prefix, &wanted, existing, provenance)? {
        tracing::info!(
            "{}: reusing merge snapshot {} for component {}",
            publication.full_name(),
            name,
            component
        );
        return Ok(name);
    }

    let name = format!("{}-{}", prefix, publication.timestamp());
    let mut package_refs = Vec::new();
    for source in sources {
        package_refs.extend(api.snapshot_packages(source, None).await?);
    }

    tracing::info!(
        "{}: creating merge snapshot {} for component {} from {:?}",
        publication.full_name(),
        name,
        component,
        wanted
    );
    let request = CreateSnapshotRequest {
        name: name.clone(),
        description: provenance.encode(&wanted),
        source_snapshots: sources.to_vec(),
        package_refs,
    };
    match api.create_snapshot(&request).await {
        Ok(()) => {}
        Err(e) if e.is_conflict() => {
            tracing::info!("Snapshot {} already exists: {}", name, e);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(name)
}

/// Newest merge snapshot of `prefix` whose sources equal `wanted`
///
/// `existing` is ordered oldest first.
fn find_reusable(
    prefix: &str,
    wanted: &[String],
    existing: &[Snapshot],
    provenance: &dyn SourceProvenance,
) -> Result<Option<String>> {
    let pattern = format!(r"^{}-\d+$", regex::escape(prefix));
    let candidate = Regex::new(&pattern).map_err(|e| EngineError::InvalidPattern {
        pattern: pattern.clone(),
        reason: e.to_string(),
    })?;

    Ok(existing
        .iter()
        .rev()
        .filter(|s| candidate.is_match(&s.name))
        .find(|s| {
            provenance.decode(&s.description).is_some_and(|mut found| {
                found.sort();
                found == wanted
            })
        })
        .map(|s| s.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aptpub_client::MockAptly;
    use aptpub_core::DescriptionProvenance;

    const FOO: &str = "Pamd64 foo 1.0 aaa";
    const BAR: &str = "Pamd64 bar 1.0 bbb";

    fn mock() -> MockAptly {
        MockAptly::new()
            .with_snapshot("a", "", &[FOO])
            .with_snapshot("b", "", &[BAR])
    }

    fn publication(timestamp: i64, sources: &[&str]) -> Publication {
        let mut publication =
            Publication::new(PublicationId::parse("xenial/nightly", "").unwrap(), timestamp);
        for source in sources {
            publication.add(*source, "main");
        }
        publication
    }

    #[test]
    fn test_merge_prefix() {
        let id = PublicationId::parse("s3:mirror:xenial/nightly", "").unwrap();
        assert_eq!(merge_prefix(&id, "main"), "_s3-mirror-xenial-nightly-main");
    }

    #[tokio::test]
    async fn test_single_source_makes_no_remote_call() {
        let mock = mock();
        let resolved = merge(&mock, &publication(1, &["a"]), &DescriptionProvenance)
            .await
            .unwrap();
        assert_eq!(resolved.get("main"), Some("a"));
        assert_eq!(mock.operation_counts().reads, 0);
        assert_eq!(mock.operation_counts().mutations(), 0);
    }

    #[tokio::test]
    async fn test_merge_creates_snapshot_with_provenance() {
        let mock = mock();
        let resolved = merge(&mock, &publication(100, &["b", "a"]), &DescriptionProvenance)
            .await
            .unwrap();

        let name = "_xenial-nightly-main-100";
        assert_eq!(resolved.get("main"), Some(name));
        assert_eq!(
            mock.snapshot_description(name).unwrap(),
            "Merged from sources: 'a', 'b'"
        );
        let mut refs = mock.snapshot_refs(name).unwrap();
        refs.sort();
        assert_eq!(refs, vec![BAR.to_string(), FOO.to_string()]);
    }

    #[tokio::test]
    async fn test_merge_is_idempotent_for_set_equal_sources() {
        let mock = mock();
        let first = merge(&mock, &publication(100, &["a", "b"]), &DescriptionProvenance)
            .await
            .unwrap();
        let second = merge(&mock, &publication(200, &["b", "a"]), &DescriptionProvenance)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.operation_counts().snapshot_creates, 1);
    }

    #[tokio::test]
    async fn test_merge_ignores_merge_with_other_sources() {
        let mock = mock()
            .with_snapshot("c", "", &["Pamd64 baz 1.0 ccc"])
            .with_snapshot(
                "_xenial-nightly-main-50",
                "Merged from sources: 'a', 'c'",
                &[FOO, "Pamd64 baz 1.0 ccc"],
            );
        let resolved = merge(&mock, &publication(100, &["a", "b"]), &DescriptionProvenance)
            .await
            .unwrap();
        assert_eq!(resolved.get("main"), Some("_xenial-nightly-main-100"));
        assert_eq!(mock.operation_counts().snapshot_creates, 1);
    }

    #[tokio::test]
    async fn test_merge_ignores_names_outside_prefix() {
        let mock = mock().with_snapshot(
            "_xenial-nightly-main-extra-50",
            "Merged from sources: 'a', 'b'",
            &[FOO, BAR],
        );
        let resolved = merge(&mock, &publication(100, &["a", "b"]), &DescriptionProvenance)
            .await
            .unwrap();
        assert_eq!(resolved.get("main"), Some("_xenial-nightly-main-100"));
    }

    #[tokio::test]
    async fn test_merge_existing_name_is_not_an_error() {
        let mock = mock().with_snapshot("_xenial-nightly-main-100", "manual", &[FOO]);
        let resolved = merge(&mock, &publication(100, &["a", "b"]), &DescriptionProvenance)
            .await
            .unwrap();
        assert_eq!(resolved.get("main"), Some("_xenial-nightly-main-100"));
    }

    #[tokio::test]
    async fn test_merge_propagates_missing_source() {
        let mock = mock();
        let err = merge(&mock, &publication(100, &["a", "gone"]), &DescriptionProvenance)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
}
