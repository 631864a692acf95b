//! Dump and restore of publications
//!
//! A dump records every package of every published component. Restoring
//! recreates one `restored-{snapshot}` per component, reusing one left by an
//! earlier restore of the same packages. When any creation fails, the
//! snapshots created so far are deleted again.

use std::collections::BTreeMap;

use aptpub_client::{AptlyApi, ClientError, CreateSnapshotRequest};
use aptpub_core::{DumpComponent, DumpDocument, DumpPackage, PackageRef};

use crate::error::{EngineError, Result};
use crate::publication::Publication;

/// Name prefix of restored snapshots
pub const RESTORED_PREFIX: &str = "restored-";

/// Description and packages of one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotContents {
    pub description: String,
    pub packages: Vec<PackageRef>,
}

/// Fetch what a publication serves and build its dump document
pub async fn dump(api: &dyn AptlyApi, publication: &Publication) -> Result<DumpDocument> {
    let mut contents = BTreeMap::new();
    for (_, snapshot) in served(publication)?.iter() {
        let description = api.get_snapshot(snapshot).await?.description;
        let packages = api.snapshot_packages(snapshot, None).await?;
        contents.insert(
            snapshot.to_string(),
            SnapshotContents {
                description,
                packages,
            },
        );
    }
    dump_document(publication, &contents)
}

/// Build a dump document from already fetched snapshot contents
pub fn dump_document(
    publication: &Publication,
    contents: &BTreeMap<String, SnapshotContents>,
) -> Result<DumpDocument> {
    let mut components = Vec::new();
    for (component, snapshot) in served(publication)?.iter() {
        let snapshot_contents = contents.get(snapshot).cloned().unwrap_or_default();
        components.push(DumpComponent {
            component: component.to_string(),
            snapshot: snapshot.to_string(),
            description: snapshot_contents.description,
            packages: snapshot_contents
                .packages
                .iter()
                .map(DumpPackage::from_ref)
                .collect(),
        });
    }

    Ok(DumpDocument {
        publish: publication.full_name(),
        storage: publication.id().storage.clone(),
        name: publication.timestamp().to_string(),
        components,
    })
}

fn served(publication: &Publication) -> Result<&aptpub_core::ResolvedSources> {
    publication
        .resolved()
        .or(publication.remote())
        .ok_or_else(|| EngineError::Unresolved {
            name: publication.full_name(),
        })
}

/// Recreate snapshots from a dump into `target`'s desired composition
///
/// Empty `components` restores every component of the document. Other
/// components of the target are left untouched. Returns the restored
/// snapshot names.
pub async fn restore(
    api: &dyn AptlyApi,
    document: &DumpDocument,
    target: &mut Publication,
    components: &[String],
) -> Result<Vec<String>> {
    let selected: Vec<&DumpComponent> = if components.is_empty() {
        document.components.iter().collect()
    } else {
        components
            .iter()
            .map(|c| {
                document
                    .component(c)
                    .ok_or_else(|| EngineError::component_not_found(c, &document.publish))
            })
            .collect::<Result<_>>()?
    };

    let mut requests = Vec::new();
    for component in &selected {
        let package_refs =
            component
                .package_refs()
                .map_err(|e| EngineError::CorruptedRestoreDocument {
                    component: component.component.clone(),
                    snapshot: component.snapshot.clone(),
                    reason: e.to_string(),
                })?;
        requests.push(CreateSnapshotRequest {
            name: format!("{}{}", RESTORED_PREFIX, component.snapshot),
            description: component.description.clone(),
            source_snapshots: Vec::new(),
            package_refs,
        });
    }

    let mut created: Vec<String> = Vec::new();
    for (component, request) in selected.iter().zip(&requests) {
        tracing::info!(
            "Restoring component {} of {} as {}",
            component.component,
            document.publish,
            request.name
        );
        match api.create_snapshot(request).await {
            Ok(()) => created.push(request.name.clone()),
            Err(e) if e.is_conflict() => match already_restored(api, request).await {
                Ok(true) => {
                    tracing::info!("Snapshot {} already restored, reusing it", request.name);
                }
                Ok(false) => {
                    rollback(api, &created).await;
                    return Err(e.into());
                }
                Err(lookup) => {
                    rollback(api, &created).await;
                    return Err(lookup);
                }
            },
            Err(e) => {
                rollback(api, &created).await;
                return Err(restore_error(component, e));
            }
        }
    }

    let mut desired = target.desired().clone();
    for (component, request) in selected.iter().zip(&requests) {
        desired.replace(component.component.as_str(), vec![request.name.clone()]);
    }
    target.set_desired(desired);

    Ok(requests.into_iter().map(|r| r.name).collect())
}

/// Whether an existing snapshot holds exactly the packages to restore
async fn already_restored(api: &dyn AptlyApi, request: &CreateSnapshotRequest) -> Result<bool> {
    let mut existing = api.snapshot_packages(&request.name, None).await?;
    let mut wanted = request.package_refs.clone();
    existing.sort();
    existing.dedup();
    wanted.sort();
    wanted.dedup();
    Ok(existing == wanted)
}

/// Delete snapshots created by an interrupted restore
async fn rollback(api: &dyn AptlyApi, created: &[String]) {
    for name in created.iter().rev() {
        tracing::warn!("Rolling back restored snapshot {}", name);
        if let Err(e) = api.delete_snapshot(name, true).await {
            tracing::warn!("Cannot delete snapshot {}: {}", name, e);
        }
    }
}

fn restore_error(component: &DumpComponent, error: ClientError) -> EngineError {
    match error.status() {
        Some(404) => EngineError::CorruptedRestoreDocument {
            component: component.component.clone(),
            snapshot: component.snapshot.clone(),
            reason: error.to_string(),
        },
        _ => error.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aptpub_client::MockAptly;
    use aptpub_core::{DescriptionProvenance, PublicationId};

    const FOO: &str = "Pamd64 foo 1.0 aaa";
    const BAR: &str = "Pi386 bar 2.0 bbb";

    fn id(name: &str) -> PublicationId {
        PublicationId::parse(name, "").unwrap()
    }

    async fn dumped(mock: &MockAptly) -> DumpDocument {
        let publication = Publication::load(mock, &id("nightly"), 77, &DescriptionProvenance)
            .await
            .unwrap();
        dump(mock, &publication).await.unwrap()
    }

    fn published() -> MockAptly {
        MockAptly::new()
            .with_snapshot("main-1", "Snapshot from repo main", &[FOO])
            .with_snapshot("contrib-1", "", &[BAR])
            .with_publish("nightly", &[("main", "main-1"), ("contrib", "contrib-1")])
    }

    #[tokio::test]
    async fn test_dump() {
        let doc = dumped(&published()).await;
        assert_eq!(doc.publish, "nightly");
        assert_eq!(doc.name, "77");
        let main = doc.component("main").unwrap();
        assert_eq!(main.snapshot, "main-1");
        assert_eq!(main.description, "Snapshot from repo main");
        assert_eq!(main.packages[0].package, "foo");
        assert_eq!(main.packages[0].arch, "amd64");
        assert_eq!(main.packages[0].id, "aaa");
    }

    #[tokio::test]
    async fn test_restore_replaces_selected_components() {
        let mock = published();
        let doc = dumped(&mock).await;
        let mut target = Publication::new(id("nightly"), 78);
        target.add("other-1", "non-free");

        let created = restore(&mock, &doc, &mut target, &["main".to_string()])
            .await
            .unwrap();

        assert_eq!(created, vec!["restored-main-1"]);
        assert_eq!(target.desired().get("main").unwrap(), ["restored-main-1"]);
        assert_eq!(target.desired().get("non-free").unwrap(), ["other-1"]);
        assert!(!target.desired().contains("contrib"));
        assert_eq!(
            mock.snapshot_refs("restored-main-1").unwrap(),
            vec![FOO.to_string()]
        );
    }

    #[tokio::test]
    async fn test_restore_twice_reuses_snapshots() {
        let mock = published();
        let doc = dumped(&mock).await;

        let mut first = Publication::new(id("nightly"), 78);
        restore(&mock, &doc, &mut first, &[]).await.unwrap();
        mock.reset_counts();

        let mut second = Publication::new(id("nightly"), 79);
        let restored = restore(&mock, &doc, &mut second, &[]).await.unwrap();

        assert_eq!(restored, vec!["restored-contrib-1", "restored-main-1"]);
        assert_eq!(second.desired(), first.desired());
        assert_eq!(mock.operation_counts().snapshot_deletes, 0);
    }

    #[tokio::test]
    async fn test_restore_conflicting_snapshot_is_not_reused() {
        let mock = published().with_snapshot("restored-contrib-1", "", &[FOO]);
        let doc = dumped(&mock).await;
        let mut target = Publication::new(id("nightly"), 78);

        let err = restore(&mock, &doc, &mut target, &[]).await.unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert!(!mock.snapshot_names().contains(&"restored-main-1".to_string()));
        assert!(target.desired().is_empty());
    }

    #[tokio::test]
    async fn test_restore_unknown_component_makes_no_mutation() {
        let mock = published();
        let doc = dumped(&mock).await;
        let mut target = Publication::new(id("nightly"), 78);
        mock.reset_counts();

        let err = restore(&mock, &doc, &mut target, &["non-free".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ComponentNotFound { .. }));
        assert_eq!(mock.operation_counts().mutations(), 0);
    }

    #[tokio::test]
    async fn test_restore_rolls_back_on_missing_package() {
        let mock = published();
        let mut doc = dumped(&mock).await;
        let gone = PackageRef::parse("Pi386 bar 2.0 deleted").unwrap();
        doc.components
            .iter_mut()
            .find(|c| c.component == "main")
            .unwrap()
            .packages
            .push(DumpPackage::from_ref(&gone));
        let mut target = Publication::new(id("nightly"), 78);

        let err = restore(&mock, &doc, &mut target, &[]).await.unwrap_err();

        assert!(matches!(
            err,
            EngineError::CorruptedRestoreDocument { ref component, .. } if component == "main"
        ));
        assert!(
            mock.snapshot_names()
                .iter()
                .all(|name| !name.starts_with(RESTORED_PREFIX))
        );
        assert!(target.desired().is_empty());
    }

    #[tokio::test]
    async fn test_restore_other_errors_propagate_after_rollback() {
        let mock = published().fail_snapshot_create("restored-main-1", 500);
        let doc = dumped(&mock).await;
        let mut target = Publication::new(id("nightly"), 78);

        let err = restore(&mock, &doc, &mut target, &[]).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(!mock.snapshot_names().contains(&"restored-contrib-1".to_string()));
        assert_eq!(mock.operation_counts().snapshot_deletes, 1);
    }

    #[tokio::test]
    async fn test_restore_malformed_key() {
        let mock = published();
        let mut doc = dumped(&mock).await;
        doc.components[0].packages[0].key = Some("not a key".to_string());
        let mut target = Publication::new(id("nightly"), 78);

        let err = restore(&mock, &doc, &mut target, &[]).await.unwrap_err();
        assert!(matches!(err, EngineError::CorruptedRestoreDocument { .. }));
        assert_eq!(mock.operation_counts().snapshot_creates, 0);
    }
}
