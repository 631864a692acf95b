//! Typed aptly API
//!
//! [`AptlyApi`] is the seam between the publication engine and the remote
//! service. [`AptlyClient`] implements it over HTTP, [`crate::MockAptly`] in
//! memory.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use aptpub_core::{PackageRef, PublicationId, ResolvedSources};

use crate::error::{ClientError, Result};
use crate::http::AptlyClient;

// ============ Wire types ============

/// A publication as listed by `GET /api/publish`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishedRepo {
    #[serde(default)]
    pub storage: String,
    #[serde(default)]
    pub prefix: String,
    pub distribution: String,
    #[serde(default)]
    pub source_kind: String,
    #[serde(default)]
    pub sources: Vec<PublishSource>,
    #[serde(default)]
    pub architectures: Vec<String>,
}

impl PublishedRepo {
    pub fn id(&self) -> PublicationId {
        PublicationId::new(&self.storage, &self.prefix, &self.distribution)
    }

    /// Snapshot published for each component
    pub fn sources(&self) -> ResolvedSources {
        self.sources
            .iter()
            .map(|s| (s.component.as_str(), s.name.as_str()))
            .collect()
    }
}

/// One component of a publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishSource {
    pub component: String,
    pub name: String,
}

impl PublishSource {
    /// Sources of a resolved composition, in component order
    pub fn from_resolved(sources: &ResolvedSources) -> Vec<Self> {
        sources
            .iter()
            .map(|(component, name)| Self {
                component: component.to_string(),
                name: name.to_string(),
            })
            .collect()
    }
}

/// Snapshot metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Snapshot {
    pub name: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub description: String,
}

/// One line of `GET /api/snapshots/{left}/diff/{right}`
///
/// A side is `None` when the package is missing from that snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotDiffEntry {
    pub left: Option<String>,
    pub right: Option<String>,
}

/// `POST /api/publish/{prefix}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreatePublishRequest {
    pub source_kind: String,
    pub distribution: String,
    pub sources: Vec<PublishSource>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub architectures: Vec<String>,
    pub force_overwrite: bool,
    pub skip_contents: bool,
}

impl CreatePublishRequest {
    pub fn snapshots(distribution: impl Into<String>, sources: Vec<PublishSource>) -> Self {
        Self {
            source_kind: "snapshot".to_string(),
            distribution: distribution.into(),
            sources,
            architectures: Vec::new(),
            force_overwrite: false,
            skip_contents: true,
        }
    }
}

/// `PUT /api/publish/{prefix}/{distribution}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdatePublishRequest {
    pub snapshots: Vec<PublishSource>,
    pub force_overwrite: bool,
    pub skip_contents: bool,
}

/// `POST /api/snapshots`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateSnapshotRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub source_snapshots: Vec<String>,
    #[serde(default)]
    pub package_refs: Vec<PackageRef>,
}

/// Package allow-list, sent as an aptly package query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageQuery {
    names: Vec<String>,
}

impl PackageQuery {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether a package name is allowed
    pub fn matches(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// `Name (= a) | Name (= b)`
    pub fn to_query(&self) -> String {
        self.names
            .iter()
            .map(|n| format!("Name (= {})", n))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

// ============ Trait ============

/// Operations of the remote repository service
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait AptlyApi: Send + Sync {
    /// Service version string
    async fn version(&self) -> Result<String>;

    /// All publications
    async fn list_publishes(&self) -> Result<Vec<PublishedRepo>>;

    /// Publish snapshots under a new distribution
    async fn create_publish(&self, id: &PublicationId, request: &CreatePublishRequest)
        -> Result<()>;

    /// Switch an existing publication to other snapshots
    async fn update_publish(&self, id: &PublicationId, request: &UpdatePublishRequest)
        -> Result<()>;

    /// Remove a publication
    async fn drop_publish(&self, id: &PublicationId, force: bool) -> Result<()>;

    /// All snapshots, oldest first
    async fn list_snapshots(&self) -> Result<Vec<Snapshot>>;

    async fn get_snapshot(&self, name: &str) -> Result<Snapshot>;

    async fn create_snapshot(&self, request: &CreateSnapshotRequest) -> Result<()>;

    async fn delete_snapshot(&self, name: &str, force: bool) -> Result<()>;

    /// Package keys of a snapshot, optionally restricted to an allow-list
    async fn snapshot_packages(
        &self,
        name: &str,
        query: Option<&PackageQuery>,
    ) -> Result<Vec<PackageRef>>;

    /// Package-level difference between two snapshots
    async fn snapshot_diff(&self, left: &str, right: &str) -> Result<Vec<SnapshotDiffEntry>>;

    async fn repo_packages(&self, name: &str) -> Result<Vec<PackageRef>>;

    async fn delete_repo_packages(&self, name: &str, refs: &[PackageRef]) -> Result<()>;

    /// Find one publication by identity
    async fn find_publish(&self, id: &PublicationId) -> Result<Option<PublishedRepo>> {
        Ok(self.list_publishes().await?.into_iter().find(|p| {
            id.matches_remote(&p.storage, &p.prefix, &p.distribution)
        }))
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

/// Decode a list, treating `null` as empty
fn decode_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>> {
    match value {
        Value::Null => Ok(Vec::new()),
        other => decode(other),
    }
}

fn decode_refs(value: Value) -> Result<Vec<PackageRef>> {
    let keys: Vec<String> = decode_list(value)?;
    PackageRef::parse_all(&keys).map_err(|e| ClientError::Serialization(e.to_string()))
}

fn publish_path(id: &PublicationId) -> String {
    format!("/publish/{}/{}", id.api_prefix(), id.distribution)
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PackageRefsBody<'a> {
    package_refs: &'a [PackageRef],
}

#[async_trait]
impl AptlyApi for AptlyClient {
    async fn version(&self) -> Result<String> {
        let value = self.get("/version", &[]).await?;
        Ok(value
            .get("Version")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    async fn list_publishes(&self) -> Result<Vec<PublishedRepo>> {
        decode_list(self.get("/publish", &[]).await?)
    }

    async fn create_publish(
        &self,
        id: &PublicationId,
        request: &CreatePublishRequest,
    ) -> Result<()> {
        self.post(&format!("/publish/{}", id.api_prefix()), request)
            .await?;
        Ok(())
    }

    async fn update_publish(
        &self,
        id: &PublicationId,
        request: &UpdatePublishRequest,
    ) -> Result<()> {
        self.put(&publish_path(id), request).await?;
        Ok(())
    }

    async fn drop_publish(&self, id: &PublicationId, force: bool) -> Result<()> {
        let query: &[(&str, &str)] = if force { &[("force", "1")] } else { &[] };
        self.delete::<()>(&publish_path(id), query, None).await?;
        Ok(())
    }

    async fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        decode_list(self.get("/snapshots", &[("sort", "time")]).await?)
    }

    async fn get_snapshot(&self, name: &str) -> Result<Snapshot> {
        decode(self.get(&format!("/snapshots/{}", name), &[]).await?)
    }

    async fn create_snapshot(&self, request: &CreateSnapshotRequest) -> Result<()> {
        self.post("/snapshots", request).await?;
        Ok(())
    }

    async fn delete_snapshot(&self, name: &str, force: bool) -> Result<()> {
        let query: &[(&str, &str)] = if force { &[("force", "1")] } else { &[] };
        self.delete::<()>(&format!("/snapshots/{}", name), query, None)
            .await?;
        Ok(())
    }

    async fn snapshot_packages(
        &self,
        name: &str,
        query: Option<&PackageQuery>,
    ) -> Result<Vec<PackageRef>> {
        let path = format!("/snapshots/{}/packages", name);
        let value = match query {
            Some(query) => self.get(&path, &[("q", query.to_query().as_str())]).await?,
            None => self.get(&path, &[]).await?,
        };
        decode_refs(value)
    }

    async fn snapshot_diff(&self, left: &str, right: &str) -> Result<Vec<SnapshotDiffEntry>> {
        decode_list(
            self.get(&format!("/snapshots/{}/diff/{}", left, right), &[])
                .await?,
        )
    }

    async fn repo_packages(&self, name: &str) -> Result<Vec<PackageRef>> {
        decode_refs(self.get(&format!("/repos/{}/packages", name), &[]).await?)
    }

    async fn delete_repo_packages(&self, name: &str, refs: &[PackageRef]) -> Result<()> {
        let body = PackageRefsBody { package_refs: refs };
        self.delete(&format!("/repos/{}/packages", name), &[], Some(&body))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_query() {
        let query = PackageQuery::names(["nginx", "curl"]);
        assert_eq!(query.to_query(), "Name (= nginx) | Name (= curl)");
        assert!(query.matches("curl"));
        assert!(!query.matches("nginx-common"));
        assert!(PackageQuery::default().is_empty());
    }

    #[test]
    fn test_published_repo_wire_format() {
        let json = r#"{
            "Architectures": ["amd64"],
            "Distribution": "nightly",
            "Label": "",
            "Prefix": "xenial",
            "SourceKind": "snapshot",
            "Sources": [{"Component": "main", "Name": "main-1"}],
            "Storage": "s3:mirror"
        }"#;
        let repo: PublishedRepo = serde_json::from_str(json).unwrap();
        assert_eq!(repo.id().full_name(), "s3:mirror:xenial/nightly");
        assert_eq!(repo.sources().get("main"), Some("main-1"));
    }

    #[test]
    fn test_create_publish_request_wire_format() {
        let sources: ResolvedSources = [("main", "main-1")].into_iter().collect();
        let mut request =
            CreatePublishRequest::snapshots("nightly", PublishSource::from_resolved(&sources));
        request.architectures = vec!["amd64".to_string()];
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["SourceKind"], "snapshot");
        assert_eq!(json["Distribution"], "nightly");
        assert_eq!(json["Sources"][0]["Component"], "main");
        assert_eq!(json["Architectures"][0], "amd64");
        assert_eq!(json["SkipContents"], true);
    }

    #[test]
    fn test_create_snapshot_request_serializes_keys() {
        let request = CreateSnapshotRequest {
            name: "s".to_string(),
            description: "d".to_string(),
            source_snapshots: vec!["a".to_string()],
            package_refs: vec![PackageRef::parse("Pamd64 foo 1.0 abc").unwrap()],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["PackageRefs"][0], "Pamd64 foo 1.0 abc");
        assert_eq!(json["SourceSnapshots"][0], "a");
    }

    #[test]
    fn test_diff_entry_null_side() {
        let entries: Vec<SnapshotDiffEntry> =
            serde_json::from_str(r#"[{"Left": null, "Right": "Pamd64 foo 1.0 abc"}]"#).unwrap();
        assert_eq!(entries[0].left, None);
    }
}
