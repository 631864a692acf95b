//! Publication entity
//!
//! A publication holds three views of its components:
//! - `desired`: what the caller wants to publish, possibly several sources
//!   per component,
//! - `resolved`: one snapshot per component, computed by the merge engine,
//! - `remote`: what the service currently serves.
//!
//! Each view is replaced as a whole. Changing the desired composition drops
//! the resolved view until the next merge.

use aptpub_client::{AptlyApi, PublishedRepo};
use aptpub_core::{Composition, PublicationId, ResolvedSources, SourceProvenance};

use crate::error::{EngineError, Result};

/// One publication and its composition state
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    id: PublicationId,
    timestamp: i64,
    architectures: Vec<String>,
    desired: Composition,
    resolved: Option<ResolvedSources>,
    remote: Option<ResolvedSources>,
}

impl Publication {
    /// Create an empty publication that does not exist remotely yet
    ///
    /// `timestamp` tags every snapshot generated on its behalf.
    pub fn new(id: PublicationId, timestamp: i64) -> Self {
        Self {
            id,
            timestamp,
            architectures: Vec::new(),
            desired: Composition::new(),
            resolved: None,
            remote: None,
        }
    }

    pub fn with_architectures(mut self, architectures: Vec<String>) -> Self {
        self.architectures = architectures;
        self
    }

    /// Add architectures that are not listed yet
    pub fn add_architectures(&mut self, architectures: &[String]) {
        for arch in architectures {
            if !self.architectures.contains(arch) {
                self.architectures.push(arch.clone());
            }
        }
    }

    /// Load the current remote state of a publication
    ///
    /// Published merge snapshots are expanded back into their sources, so
    /// the desired composition matches what was originally asked for.
    pub async fn load(
        api: &dyn AptlyApi,
        id: &PublicationId,
        timestamp: i64,
        provenance: &dyn SourceProvenance,
    ) -> Result<Self> {
        let published = api
            .find_publish(id)
            .await?
            .ok_or_else(|| EngineError::NoSuchPublication {
                name: id.full_name(),
            })?;
        Self::from_remote(api, &published, timestamp, provenance).await
    }

    /// Build a publication from an entry of the publish list
    pub async fn from_remote(
        api: &dyn AptlyApi,
        published: &PublishedRepo,
        timestamp: i64,
        provenance: &dyn SourceProvenance,
    ) -> Result<Self> {
        let remote = published.sources();
        let mut desired = Composition::new();

        for (component, name) in remote.iter() {
            let snapshot = api.get_snapshot(name).await?;
            match provenance.decode(&snapshot.description) {
                Some(sources) => {
                    tracing::debug!(
                        "{}: component {} is merged from {:?}",
                        published.id(),
                        component,
                        sources
                    );
                    desired.replace(component, sources);
                }
                None => desired.add(component, name),
            }
        }

        Ok(Self {
            id: published.id(),
            timestamp,
            architectures: published.architectures.clone(),
            desired,
            resolved: Some(remote.clone()),
            remote: Some(remote),
        })
    }

    /// Re-read what the service currently serves
    pub async fn refresh_remote(&mut self, api: &dyn AptlyApi) -> Result<()> {
        self.remote = api.find_publish(&self.id).await?.map(|p| p.sources());
        Ok(())
    }

    pub fn id(&self) -> &PublicationId {
        &self.id
    }

    pub fn full_name(&self) -> String {
        self.id.full_name()
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn architectures(&self) -> &[String] {
        &self.architectures
    }

    pub fn desired(&self) -> &Composition {
        &self.desired
    }

    pub fn resolved(&self) -> Option<&ResolvedSources> {
        self.resolved.as_ref()
    }

    pub fn remote(&self) -> Option<&ResolvedSources> {
        self.remote.as_ref()
    }

    /// Whether the publication exists on the service, as last observed
    pub fn is_published(&self) -> bool {
        self.remote.is_some()
    }

    /// Append a source snapshot to a component
    pub fn add(&mut self, snapshot: impl Into<String>, component: impl Into<String>) {
        let mut desired = self.desired.clone();
        desired.add(component, snapshot);
        self.set_desired(desired);
    }

    /// Replace a component's sources
    pub fn replace_component(&mut self, component: impl Into<String>, snapshots: Vec<String>) {
        let mut desired = self.desired.clone();
        desired.replace(component, snapshots);
        self.set_desired(desired);
    }

    /// Install a new desired composition
    pub fn set_desired(&mut self, desired: Composition) {
        if desired != self.desired {
            self.resolved = None;
        }
        self.desired = desired;
    }

    /// Install merge output
    pub fn set_resolved(&mut self, resolved: ResolvedSources) {
        self.resolved = Some(resolved);
    }

    /// Builder form of [`Publication::set_resolved`]
    pub fn with_resolved(mut self, resolved: ResolvedSources) -> Self {
        self.set_resolved(resolved);
        self
    }

    pub fn set_remote(&mut self, remote: Option<ResolvedSources>) {
        self.remote = remote;
    }

    /// Resolved sources, or an error naming the publication
    pub fn require_resolved(&self) -> Result<&ResolvedSources> {
        self.resolved.as_ref().ok_or_else(|| EngineError::Unresolved {
            name: self.full_name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aptpub_client::MockAptly;
    use aptpub_core::DescriptionProvenance;

    fn id(name: &str) -> PublicationId {
        PublicationId::parse(name, "").unwrap()
    }

    #[tokio::test]
    async fn test_load_missing_publication() {
        let mock = MockAptly::new();
        let err = Publication::load(&mock, &id("nightly"), 1, &DescriptionProvenance)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NoSuchPublication { ref name } if name == "nightly"));
    }

    #[tokio::test]
    async fn test_load_expands_merge_snapshots() {
        let mock = MockAptly::new()
            .with_snapshot("a-1", "Snapshot from mirror a", &["Pamd64 foo 1.0 aaa"])
            .with_snapshot("b-1", "", &["Pamd64 bar 1.0 bbb"])
            .with_snapshot(
                "_nightly-main-5",
                "Merged from sources: 'a-1', 'b-1'",
                &["Pamd64 foo 1.0 aaa", "Pamd64 bar 1.0 bbb"],
            )
            .with_snapshot("contrib-1", "", &[])
            .with_publish("nightly", &[("main", "_nightly-main-5"), ("contrib", "contrib-1")]);

        let publication = Publication::load(&mock, &id("nightly"), 9, &DescriptionProvenance)
            .await
            .unwrap();

        assert_eq!(publication.desired().get("main").unwrap(), ["a-1", "b-1"]);
        assert_eq!(publication.desired().get("contrib").unwrap(), ["contrib-1"]);
        assert_eq!(
            publication.remote().unwrap().get("main"),
            Some("_nightly-main-5")
        );
        assert_eq!(publication.resolved(), publication.remote());
        assert_eq!(publication.timestamp(), 9);
    }

    #[test]
    fn test_changing_desired_drops_resolved() {
        let resolved: ResolvedSources = [("main", "a")].into_iter().collect();
        let mut publication = Publication::new(id("nightly"), 1).with_resolved(resolved);
        publication.set_desired(publication.desired().clone());
        assert!(publication.resolved().is_some());

        publication.add("a", "main");
        assert!(publication.resolved().is_none());
        assert!(publication.require_resolved().is_err());
    }

    #[test]
    fn test_replace_component() {
        let mut publication = Publication::new(id("nightly"), 1);
        publication.add("a", "main");
        publication.add("b", "main");
        publication.replace_component("main", vec!["c".to_string()]);
        assert_eq!(publication.desired().get("main").unwrap(), ["c"]);
    }
}
