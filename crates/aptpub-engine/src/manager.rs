//! Management of many publications at once
//!
//! [`PublishManager`] builds publications from the publisher configuration,
//! publishes them concurrently, loads every remote publication for dumps and
//! cleans up snapshots nothing refers to anymore.

use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use aptpub_client::{AptlyApi, Snapshot};
use aptpub_core::{DescriptionProvenance, DumpDocument, PublicationId, SourceProvenance};

use crate::cancel::CancelFlag;
use crate::config::PublisherConfig;
use crate::error::{EngineError, Result};
use crate::merge::merge;
use crate::publication::Publication;
use crate::purge::{purge, PurgeOptions};
use crate::reconcile::{reconcile, ReconcileOutcome, ReconcilePolicy};
use crate::restore::{dump_document, SnapshotContents};

/// Default number of publications published at the same time
pub const DEFAULT_CONCURRENCY: usize = 4;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\d+)\}").expect("valid regex"));
static TIMESTAMPED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+)-\d+$").expect("valid regex"));

/// Which configured sources to publish
#[derive(Debug, Clone, Default)]
pub struct SourceFilter {
    /// Only these distributions (last path element)
    pub distributions: Vec<String>,
    /// Only these publications, by full name
    pub publications: Vec<String>,
    /// Only these components
    pub components: Vec<String>,
    /// Replace the configured architectures
    pub architectures: Vec<String>,
}

impl SourceFilter {
    fn accepts(&self, id: &PublicationId, component: &str) -> bool {
        (self.distributions.is_empty() || self.distributions.contains(&id.distribution))
            && (self.publications.is_empty() || self.publications.contains(&id.full_name()))
            && (self.components.is_empty() || self.components.iter().any(|c| c == component))
    }
}

/// Settings of a publish-many run
#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub policy: ReconcilePolicy,
    /// Purge every publication to latest versions after merging
    pub only_latest: bool,
    pub concurrency: usize,
    pub cancel: CancelFlag,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            policy: ReconcilePolicy::default(),
            only_latest: false,
            concurrency: DEFAULT_CONCURRENCY,
            cancel: CancelFlag::new(),
        }
    }
}

/// Per-publication results of a publish-many run, sorted by name
#[derive(Debug, Default)]
pub struct PublishSummary {
    pub results: Vec<(String, Result<ReconcileOutcome>)>,
}

impl PublishSummary {
    pub fn failures(&self) -> impl Iterator<Item = (&str, &EngineError)> {
        self.results
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| (name.as_str(), e)))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Outcome of a snapshot cleanup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
    /// Deletion refused because the snapshot is still in use
    pub in_use: Vec<String>,
    pub kept: usize,
}

/// A publication with the contents of every snapshot it serves
#[derive(Debug, Clone)]
pub struct LoadedPublication {
    pub publication: Publication,
    pub snapshots: BTreeMap<String, SnapshotContents>,
}

impl LoadedPublication {
    pub fn to_dump(&self) -> Result<DumpDocument> {
        dump_document(&self.publication, &self.snapshots)
    }
}

/// Coordinates operations across publications
pub struct PublishManager {
    api: Arc<dyn AptlyApi>,
    provenance: Arc<dyn SourceProvenance>,
    timestamp: i64,
    publications: BTreeMap<PublicationId, Publication>,
    /// Snapshot list, oldest first, fetched on first use
    snapshots: Option<Vec<Snapshot>>,
}

impl PublishManager {
    pub fn new(api: Arc<dyn AptlyApi>, timestamp: i64) -> Self {
        Self {
            api,
            provenance: Arc::new(DescriptionProvenance),
            timestamp,
            publications: BTreeMap::new(),
            snapshots: None,
        }
    }

    pub fn with_provenance(mut self, provenance: Arc<dyn SourceProvenance>) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn api(&self) -> &dyn AptlyApi {
        self.api.as_ref()
    }

    pub fn provenance(&self) -> &dyn SourceProvenance {
        self.provenance.as_ref()
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Publication being built, created empty on first access
    pub fn publication_mut(&mut self, id: &PublicationId) -> &mut Publication {
        let timestamp = self.timestamp;
        self.publications
            .entry(id.clone())
            .or_insert_with(|| Publication::new(id.clone(), timestamp))
    }

    pub fn publications(&self) -> impl Iterator<Item = &Publication> {
        self.publications.values()
    }

    /// Add a snapshot to a component of a publication
    pub fn add(&mut self, id: &PublicationId, component: &str, snapshot: &str) {
        self.publication_mut(id).add(snapshot, component);
    }

    /// Latest snapshot named `{name}-{timestamp}`
    pub async fn latest_snapshot(&mut self, name: &str) -> Result<Option<String>> {
        if self.snapshots.is_none() {
            self.snapshots = Some(self.api.list_snapshots().await?);
        }
        let pattern = format!(r"^{}-\d+$", regex::escape(name));
        let matcher = Regex::new(&pattern).map_err(|e| EngineError::InvalidPattern {
            pattern,
            reason: e.to_string(),
        })?;

        Ok(self
            .snapshots
            .as_deref()
            .unwrap_or_default()
            .iter()
            .rev()
            .find(|s| matcher.is_match(&s.name))
            .map(|s| s.name.clone()))
    }

    /// Add the latest snapshot of every configured source to its publications
    pub async fn add_from_config(
        &mut self,
        config: &PublisherConfig,
        default_storage: &str,
        filter: &SourceFilter,
    ) -> Result<()> {
        for (kind, name, entry) in config.entries() {
            let targets: Vec<PublicationId> = entry
                .publications(default_storage)?
                .into_iter()
                .filter(|id| filter.accepts(id, &entry.component))
                .collect();
            if targets.is_empty() {
                continue;
            }

            let Some(snapshot) = self.latest_snapshot(name).await? else {
                tracing::warn!("No snapshot found for {:?} {}, skipping", kind, name);
                continue;
            };

            let architectures = if filter.architectures.is_empty() {
                &entry.architectures
            } else {
                &filter.architectures
            };
            for id in targets {
                tracing::debug!("{}: {} → component {}", id, snapshot, entry.component);
                let publication = self.publication_mut(&id);
                publication.add(snapshot.as_str(), entry.component.as_str());
                publication.add_architectures(architectures);
            }
        }
        Ok(())
    }

    /// Merge, optionally purge, and reconcile every publication
    ///
    /// Publications run concurrently; a failure does not stop the others
    /// and nothing is rolled back.
    pub async fn publish_all(&mut self, options: &PublishOptions) -> PublishSummary {
        let publications = std::mem::take(&mut self.publications);
        let api = self.api.as_ref();
        let provenance = self.provenance.as_ref();

        let done: Vec<(Publication, Result<ReconcileOutcome>)> =
            stream::iter(publications.into_values().map(|mut publication| async move {
                let result = publish_one(api, provenance, &mut publication, options).await;
                (publication, result)
            }))
            .buffer_unordered(options.concurrency.max(1))
            .collect()
            .await;

        let mut summary = PublishSummary::default();
        for (publication, result) in done {
            match &result {
                Ok(outcome) => tracing::info!("{}: {}", publication.full_name(), outcome),
                Err(e) => tracing::error!("{}: {}", publication.full_name(), e),
            }
            summary.results.push((publication.full_name(), result));
            self.publications
                .insert(publication.id().clone(), publication);
        }
        summary.results.sort_by(|a, b| a.0.cmp(&b.0));
        summary
    }

    /// Load every remote publication with the packages it serves
    pub async fn load_all(&self, cancel: &CancelFlag) -> Result<Vec<LoadedPublication>> {
        cancel.check()?;
        let publishes = self.api.list_publishes().await?;
        let mut loaded = Vec::with_capacity(publishes.len());

        for published in &publishes {
            cancel.check()?;
            let publication = Publication::from_remote(
                self.api(),
                published,
                self.timestamp,
                self.provenance(),
            )
            .await?;

            let mut snapshots = BTreeMap::new();
            for (_, name) in published.sources().iter() {
                cancel.check()?;
                let description = self.api.get_snapshot(name).await?.description;
                let packages = self.api.snapshot_packages(name, None).await?;
                snapshots.insert(
                    name.to_string(),
                    SnapshotContents {
                        description,
                        packages,
                    },
                );
            }
            tracing::debug!("Loaded {}", publication.full_name());
            loaded.push(LoadedPublication {
                publication,
                snapshots,
            });
        }

        Ok(loaded)
    }

    /// Delete snapshots that are neither published nor the latest of their kind
    ///
    /// Kept: published snapshots, the newest snapshot of every base name
    /// (`{base}-{timestamp}`) and the sources of kept merge snapshots.
    /// Snapshots the service reports as in use are skipped.
    pub async fn cleanup(&self, cancel: &CancelFlag) -> Result<CleanupReport> {
        let snapshots = self.api.list_snapshots().await?;
        let publishes = self.api.list_publishes().await?;

        let mut keep: BTreeSet<String> = publishes
            .iter()
            .flat_map(|p| p.sources.iter().map(|s| s.name.clone()))
            .collect();

        let mut latest: HashMap<&str, &str> = HashMap::new();
        for snapshot in &snapshots {
            latest.insert(base_name(&snapshot.name), &snapshot.name);
        }
        keep.extend(latest.values().map(|s| s.to_string()));

        let descriptions: HashMap<&str, &str> = snapshots
            .iter()
            .map(|s| (s.name.as_str(), s.description.as_str()))
            .collect();
        let merged_sources: Vec<String> = keep
            .iter()
            .filter_map(|name| descriptions.get(name.as_str()))
            .filter_map(|description| self.provenance.decode(description))
            .flatten()
            .collect();
        keep.extend(merged_sources);

        let mut report = CleanupReport::default();
        for snapshot in snapshots.iter().rev() {
            if keep.contains(&snapshot.name) {
                report.kept += 1;
                continue;
            }
            cancel.check()?;
            match self.api.delete_snapshot(&snapshot.name, false).await {
                Ok(()) => {
                    tracing::info!("Deleted snapshot {}", snapshot.name);
                    report.deleted.push(snapshot.name.clone());
                }
                Err(e) if e.is_in_use() => {
                    tracing::warn!("Snapshot {} is in use, keeping it: {}", snapshot.name, e);
                    report.in_use.push(snapshot.name.clone());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(report)
    }

    /// Pair every publication matching `source_pattern` with a target
    ///
    /// The pattern must match a whole publication name. `{0}`, `{1}`, ... in
    /// `target_template` are replaced by its capture groups.
    pub async fn find_promotions(
        &self,
        source_pattern: &str,
        target_template: &str,
    ) -> Result<Vec<(PublicationId, PublicationId)>> {
        let invalid = |pattern: &str, reason: String| EngineError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let matcher = Regex::new(&format!("^(?:{})$", source_pattern))
            .map_err(|e| invalid(source_pattern, e.to_string()))?;
        let groups = matcher.captures_len() - 1;

        let indexes: Vec<usize> = PLACEHOLDER
            .captures_iter(target_template)
            .map(|c| c[1].parse::<usize>().unwrap_or(usize::MAX))
            .collect();
        if indexes.is_empty() {
            return Err(invalid(
                target_template,
                "target must contain a placeholder such as {0}".to_string(),
            ));
        }
        if let Some(&index) = indexes.iter().find(|&&i| i >= groups) {
            return Err(invalid(
                target_template,
                format!(
                    "placeholder {{{}}} but the source pattern has {} groups",
                    index, groups
                ),
            ));
        }

        let mut pairs = Vec::new();
        for published in self.api.list_publishes().await? {
            let source = published.id();
            let name = source.full_name();
            let Some(captures) = matcher.captures(&name) else {
                continue;
            };
            let target_name = PLACEHOLDER.replace_all(target_template, |c: &Captures| {
                let index = c[1].parse::<usize>().unwrap_or(usize::MAX);
                captures
                    .get(index + 1)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            });
            let target = PublicationId::parse(&target_name, &source.storage)?;
            tracing::debug!("Promotion {} → {}", source, target);
            pairs.push((source, target));
        }

        pairs.sort();
        Ok(pairs)
    }
}

async fn publish_one(
    api: &dyn AptlyApi,
    provenance: &dyn SourceProvenance,
    publication: &mut Publication,
    options: &PublishOptions,
) -> Result<ReconcileOutcome> {
    options.cancel.check()?;
    let resolved = merge(api, publication, provenance).await?;
    publication.set_resolved(resolved);

    if options.only_latest {
        options.cancel.check()?;
        purge(api, publication, &[], &PurgeOptions::default()).await?;
    }

    options.cancel.check()?;
    reconcile(api, publication, &options.policy).await
}

/// `main-123` → `main`; names without a timestamp are their own base
fn base_name(name: &str) -> &str {
    TIMESTAMPED
        .captures(name)
        .and_then(|c| c.get(1))
        .map_or(name, |m| m.as_str())
}
