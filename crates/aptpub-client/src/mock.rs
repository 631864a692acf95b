//! Mock aptly service for testing
//!
//! Keeps publications, snapshots and repositories in memory and answers with
//! the same status codes as aptly for the cases the engine relies on:
//! duplicate names are 400, unknown snapshots or packages are 404 and
//! deleting a published snapshot is 409.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use aptpub_core::{PackageRef, PublicationId};

use crate::api::{
    AptlyApi, CreatePublishRequest, CreateSnapshotRequest, PackageQuery,
    PublishSource, PublishedRepo, Snapshot, SnapshotDiffEntry, UpdatePublishRequest,
};
use crate::error::{ClientError, Result};

/// In-memory aptly service
#[derive(Clone, Default)]
pub struct MockAptly {
    state: Arc<RwLock<MockState>>,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub reads: usize,
    pub snapshot_creates: usize,
    pub snapshot_deletes: usize,
    pub publish_creates: usize,
    pub publish_updates: usize,
    pub publish_drops: usize,
    pub package_deletes: usize,
}

impl OperationCounts {
    /// Number of calls that changed remote state
    pub fn mutations(&self) -> usize {
        self.snapshot_creates
            + self.snapshot_deletes
            + self.publish_creates
            + self.publish_updates
            + self.publish_drops
            + self.package_deletes
    }
}

#[derive(Default)]
struct MockState {
    publishes: Vec<PublishedRepo>,
    /// Creation order
    snapshots: Vec<StoredSnapshot>,
    repos: BTreeMap<String, Vec<PackageRef>>,
    /// Every package key the service knows about
    pool: BTreeSet<PackageRef>,
    in_use: BTreeSet<String>,
    failures: BTreeMap<String, u16>,
    clock: u64,
}

#[derive(Clone)]
struct StoredSnapshot {
    snapshot: Snapshot,
    refs: Vec<PackageRef>,
}

impl MockState {
    fn snapshot(&self, name: &str) -> Option<&StoredSnapshot> {
        self.snapshots.iter().find(|s| s.snapshot.name == name)
    }

    fn publish_index(&self, id: &PublicationId) -> Option<usize> {
        self.publishes
            .iter()
            .position(|p| id.matches_remote(&p.storage, &p.prefix, &p.distribution))
    }

    fn is_published(&self, snapshot: &str) -> bool {
        self.publishes
            .iter()
            .any(|p| p.sources.iter().any(|s| s.name == snapshot))
    }

    fn insert_snapshot(&mut self, name: &str, description: &str, refs: Vec<PackageRef>) {
        self.clock += 1;
        let refs: BTreeSet<PackageRef> = refs.into_iter().collect();
        self.pool.extend(refs.iter().cloned());
        self.snapshots.push(StoredSnapshot {
            snapshot: Snapshot {
                name: name.to_string(),
                created_at: format!("{:010}", self.clock),
                description: description.to_string(),
            },
            refs: refs.into_iter().collect(),
        });
    }

    fn check_sources(&self, sources: &[PublishSource], method: &str, path: &str) -> Result<()> {
        match sources.iter().find(|s| self.snapshot(&s.name).is_none()) {
            Some(missing) => Err(ClientError::remote(
                404,
                format!("snapshot with name {} not found", missing.name),
                method,
                path,
            )),
            None => Ok(()),
        }
    }
}

impl MockAptly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a snapshot with the given packages
    pub fn with_snapshot(self, name: &str, description: &str, refs: &[&str]) -> Self {
        let refs = parse(refs);
        self.state
            .write()
            .unwrap()
            .insert_snapshot(name, description, refs);
        self
    }

    /// Add a publication serving `(component, snapshot)` pairs
    pub fn with_publish(self, full_name: &str, sources: &[(&str, &str)]) -> Self {
        let id = PublicationId::parse(full_name, "").unwrap();
        self.state.write().unwrap().publishes.push(PublishedRepo {
            storage: id.storage.clone(),
            prefix: id.remote_prefix().to_string(),
            distribution: id.distribution.clone(),
            source_kind: "snapshot".to_string(),
            sources: sources
                .iter()
                .map(|(component, name)| PublishSource {
                    component: component.to_string(),
                    name: name.to_string(),
                })
                .collect(),
            architectures: Vec::new(),
        });
        self
    }

    /// Add a local repository with the given packages
    pub fn with_repo(self, name: &str, refs: &[&str]) -> Self {
        let refs = parse(refs);
        {
            let mut state = self.state.write().unwrap();
            state.pool.extend(refs.iter().cloned());
            state.repos.insert(name.to_string(), refs);
        }
        self
    }

    /// Make package keys known to the service without adding them anywhere
    pub fn with_packages(self, refs: &[&str]) -> Self {
        self.state.write().unwrap().pool.extend(parse(refs));
        self
    }

    /// Refuse deletion of a snapshot with 409
    pub fn mark_in_use(self, snapshot: &str) -> Self {
        self.state
            .write()
            .unwrap()
            .in_use
            .insert(snapshot.to_string());
        self
    }

    /// Fail creation of the named snapshot with the given status
    pub fn fail_snapshot_create(self, snapshot: &str, status: u16) -> Self {
        self.state
            .write()
            .unwrap()
            .failures
            .insert(snapshot.to_string(), status);
        self
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        *self.operations.write().unwrap() = OperationCounts::default();
    }

    /// Snapshot names in creation order
    pub fn snapshot_names(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap()
            .snapshots
            .iter()
            .map(|s| s.snapshot.name.clone())
            .collect()
    }

    /// Package keys of a snapshot
    pub fn snapshot_refs(&self, name: &str) -> Option<Vec<String>> {
        self.state
            .read()
            .unwrap()
            .snapshot(name)
            .map(|s| s.refs.iter().map(ToString::to_string).collect())
    }

    /// Description of a snapshot
    pub fn snapshot_description(&self, name: &str) -> Option<String> {
        self.state
            .read()
            .unwrap()
            .snapshot(name)
            .map(|s| s.snapshot.description.clone())
    }

    /// Current state of a publication
    pub fn publish(&self, full_name: &str) -> Option<PublishedRepo> {
        let id = PublicationId::parse(full_name, "").ok()?;
        let state = self.state.read().unwrap();
        state.publish_index(&id).map(|i| state.publishes[i].clone())
    }

    /// Package keys of a local repository
    pub fn repo_refs(&self, name: &str) -> Option<Vec<String>> {
        self.state
            .read()
            .unwrap()
            .repos
            .get(name)
            .map(|refs| refs.iter().map(ToString::to_string).collect())
    }

    fn count(&self, update: impl FnOnce(&mut OperationCounts)) {
        let mut ops = self.operations.write().unwrap();
        update(&mut *ops);
    }
}

fn parse(refs: &[&str]) -> Vec<PackageRef> {
    PackageRef::parse_all(refs).unwrap()
}

fn not_found(what: &str, name: &str, method: &str, path: &str) -> ClientError {
    ClientError::remote(404, format!("{} with name {} not found", what, name), method, path)
}

#[async_trait]
impl AptlyApi for MockAptly {
    async fn version(&self) -> Result<String> {
        self.count(|ops| ops.reads += 1);
        Ok("1.5.0".to_string())
    }

    async fn list_publishes(&self) -> Result<Vec<PublishedRepo>> {
        self.count(|ops| ops.reads += 1);
        Ok(self.state.read().unwrap().publishes.clone())
    }

    async fn create_publish(
        &self,
        id: &PublicationId,
        request: &CreatePublishRequest,
    ) -> Result<()> {
        self.count(|ops| ops.publish_creates += 1);
        let path = format!("/publish/{}", id.api_prefix());
        let mut state = self.state.write().unwrap();

        if state.publish_index(id).is_some() {
            return Err(ClientError::remote(
                400,
                format!("prefix/distribution already used by another published repo: {}", id),
                "POST",
                &path,
            ));
        }
        state.check_sources(&request.sources, "POST", &path)?;

        state.publishes.push(PublishedRepo {
            storage: id.storage.clone(),
            prefix: id.remote_prefix().to_string(),
            distribution: request.distribution.clone(),
            source_kind: request.source_kind.clone(),
            sources: request.sources.clone(),
            architectures: request.architectures.clone(),
        });
        Ok(())
    }

    async fn update_publish(
        &self,
        id: &PublicationId,
        request: &UpdatePublishRequest,
    ) -> Result<()> {
        self.count(|ops| ops.publish_updates += 1);
        let path = format!("/publish/{}/{}", id.api_prefix(), id.distribution);
        let mut state = self.state.write().unwrap();

        let index = state
            .publish_index(id)
            .ok_or_else(|| not_found("published repository", &id.full_name(), "PUT", &path))?;

        let published = &state.publishes[index];
        if let Some(added) = request
            .snapshots
            .iter()
            .find(|s| !published.sources.iter().any(|p| p.component == s.component))
        {
            return Err(ClientError::remote(
                404,
                format!("component {} is not in published repository", added.component),
                "PUT",
                &path,
            ));
        }
        state.check_sources(&request.snapshots, "PUT", &path)?;

        let published = &mut state.publishes[index];
        for source in &request.snapshots {
            if let Some(slot) = published
                .sources
                .iter_mut()
                .find(|p| p.component == source.component)
            {
                slot.name = source.name.clone();
            }
        }
        Ok(())
    }

    async fn drop_publish(&self, id: &PublicationId, _force: bool) -> Result<()> {
        self.count(|ops| ops.publish_drops += 1);
        let path = format!("/publish/{}/{}", id.api_prefix(), id.distribution);
        let mut state = self.state.write().unwrap();
        let index = state
            .publish_index(id)
            .ok_or_else(|| not_found("published repository", &id.full_name(), "DELETE", &path))?;
        state.publishes.remove(index);
        Ok(())
    }

    async fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        self.count(|ops| ops.reads += 1);
        Ok(self
            .state
            .read()
            .unwrap()
            .snapshots
            .iter()
            .map(|s| s.snapshot.clone())
            .collect())
    }

    async fn get_snapshot(&self, name: &str) -> Result<Snapshot> {
        self.count(|ops| ops.reads += 1);
        self.state
            .read()
            .unwrap()
            .snapshot(name)
            .map(|s| s.snapshot.clone())
            .ok_or_else(|| not_found("snapshot", name, "GET", &format!("/snapshots/{}", name)))
    }

    async fn create_snapshot(&self, request: &CreateSnapshotRequest) -> Result<()> {
        self.count(|ops| ops.snapshot_creates += 1);
        let path = "/snapshots";
        let mut state = self.state.write().unwrap();

        if let Some(status) = state.failures.get(&request.name) {
            return Err(ClientError::remote(*status, "injected failure", "POST", path));
        }
        if state.snapshot(&request.name).is_some() {
            return Err(ClientError::remote(
                400,
                format!("snapshot with name {} already exists", request.name),
                "POST",
                path,
            ));
        }
        if let Some(source) = request
            .source_snapshots
            .iter()
            .find(|s| state.snapshot(s).is_none())
        {
            return Err(not_found("source snapshot", source, "POST", path));
        }
        if let Some(unknown) = request.package_refs.iter().find(|r| !state.pool.contains(r)) {
            return Err(ClientError::remote(
                404,
                format!("package {}: not found", unknown),
                "POST",
                path,
            ));
        }

        state.insert_snapshot(&request.name, &request.description, request.package_refs.clone());
        Ok(())
    }

    async fn delete_snapshot(&self, name: &str, _force: bool) -> Result<()> {
        self.count(|ops| ops.snapshot_deletes += 1);
        let path = format!("/snapshots/{}", name);
        let mut state = self.state.write().unwrap();

        let index = state
            .snapshots
            .iter()
            .position(|s| s.snapshot.name == name)
            .ok_or_else(|| not_found("snapshot", name, "DELETE", &path))?;
        if state.in_use.contains(name) || state.is_published(name) {
            return Err(ClientError::remote(
                409,
                format!("unable to drop: snapshot {} is published", name),
                "DELETE",
                &path,
            ));
        }
        state.snapshots.remove(index);
        Ok(())
    }

    async fn snapshot_packages(
        &self,
        name: &str,
        query: Option<&PackageQuery>,
    ) -> Result<Vec<PackageRef>> {
        self.count(|ops| ops.reads += 1);
        let state = self.state.read().unwrap();
        let snapshot = state.snapshot(name).ok_or_else(|| {
            not_found("snapshot", name, "GET", &format!("/snapshots/{}/packages", name))
        })?;
        Ok(snapshot
            .refs
            .iter()
            .filter(|r| query.is_none_or(|q| q.matches(r.name())))
            .cloned()
            .collect())
    }

    async fn snapshot_diff(&self, left: &str, right: &str) -> Result<Vec<SnapshotDiffEntry>> {
        self.count(|ops| ops.reads += 1);
        let path = format!("/snapshots/{}/diff/{}", left, right);
        let state = self.state.read().unwrap();
        let keyed = |name: &str| -> Result<BTreeMap<(String, String), PackageRef>> {
            let snapshot = state
                .snapshot(name)
                .ok_or_else(|| not_found("snapshot", name, "GET", &path))?;
            Ok(snapshot
                .refs
                .iter()
                .map(|r| ((r.name().to_string(), r.architecture().to_string()), r.clone()))
                .collect())
        };
        let left = keyed(left)?;
        let right = keyed(right)?;

        let keys: BTreeSet<&(String, String)> = left.keys().chain(right.keys()).collect();
        Ok(keys
            .into_iter()
            .filter_map(|key| {
                let l = left.get(key);
                let r = right.get(key);
                if l == r {
                    return None;
                }
                Some(SnapshotDiffEntry {
                    left: l.map(ToString::to_string),
                    right: r.map(ToString::to_string),
                })
            })
            .collect())
    }

    async fn repo_packages(&self, name: &str) -> Result<Vec<PackageRef>> {
        self.count(|ops| ops.reads += 1);
        self.state
            .read()
            .unwrap()
            .repos
            .get(name)
            .cloned()
            .ok_or_else(|| not_found("local repo", name, "GET", &format!("/repos/{}/packages", name)))
    }

    async fn delete_repo_packages(&self, name: &str, refs: &[PackageRef]) -> Result<()> {
        self.count(|ops| ops.package_deletes += 1);
        let path = format!("/repos/{}/packages", name);
        let mut state = self.state.write().unwrap();
        let packages = state
            .repos
            .get_mut(name)
            .ok_or_else(|| not_found("local repo", name, "DELETE", &path))?;
        packages.retain(|r| !refs.contains(r));
        Ok(())
    }
}
