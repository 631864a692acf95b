//! Publisher configuration
//!
//! Lists which mirrors and local repositories feed which publications:
//!
//! ```yaml
//! mirror:
//!   debian-main:
//!     component: main
//!     distributions: [nightly, xenial/nightly]
//! repo:
//!   internal:
//!     component: extra
//!     distributions: [nightly]
//!     storage: s3:packages
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use aptpub_core::PublicationId;

use crate::error::{EngineError, Result};

/// Default location of the publisher configuration
pub const DEFAULT_CONFIG_PATH: &str = "/etc/aptly/publisher.yaml";

/// Kind of a configured source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Mirror,
    Repo,
}

/// One mirror or local repository and where it is published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    #[serde(default = "default_component")]
    pub component: String,

    #[serde(default)]
    pub distributions: Vec<String>,

    #[serde(default)]
    pub architectures: Vec<String>,

    /// Storage of the publications, overriding the command line
    #[serde(default)]
    pub storage: Option<String>,
}

fn default_component() -> String {
    "main".to_string()
}

impl SourceEntry {
    /// Publications this source feeds
    pub fn publications(&self, default_storage: &str) -> Result<Vec<PublicationId>> {
        let storage = self.storage.as_deref().unwrap_or(default_storage);
        self.distributions
            .iter()
            .map(|d| PublicationId::parse(d, storage).map_err(EngineError::from))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherConfig {
    #[serde(default)]
    pub mirror: BTreeMap<String, SourceEntry>,

    #[serde(default)]
    pub repo: BTreeMap<String, SourceEntry>,
}

impl PublisherConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    /// All sources, mirrors first
    pub fn entries(&self) -> impl Iterator<Item = (SourceKind, &str, &SourceEntry)> {
        self.mirror
            .iter()
            .map(|(name, entry)| (SourceKind::Mirror, name.as_str(), entry))
            .chain(
                self.repo
                    .iter()
                    .map(|(name, entry)| (SourceKind::Repo, name.as_str(), entry)),
            )
    }

    /// Local repositories feeding one component of a publication
    pub fn sources_for(
        &self,
        publication: &PublicationId,
        component: &str,
        default_storage: &str,
    ) -> Vec<String> {
        self.entries()
            .filter(|(kind, _, entry)| *kind == SourceKind::Repo && entry.component == component)
            .filter(|(_, _, entry)| {
                entry
                    .publications(default_storage)
                    .map(|ids| ids.contains(publication))
                    .unwrap_or(false)
            })
            .map(|(_, name, _)| name.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
mirror:
  debian-main:
    distributions: [nightly, xenial/nightly]
    architectures: [amd64]
repo:
  internal:
    component: extra
    distributions: [nightly]
  tools:
    component: main
    distributions: [nightly]
    storage: s3:packages
"#;

    #[test]
    fn test_parse_defaults() {
        let config = PublisherConfig::from_yaml(CONFIG).unwrap();
        assert_eq!(config.mirror["debian-main"].component, "main");
        assert_eq!(config.repo["internal"].component, "extra");
        assert_eq!(config.entries().count(), 3);
    }

    #[test]
    fn test_publications_use_entry_storage() {
        let config = PublisherConfig::from_yaml(CONFIG).unwrap();
        let ids = config.repo["tools"].publications("").unwrap();
        assert_eq!(ids[0].full_name(), "s3:packages:nightly");
        let ids = config.mirror["debian-main"].publications("").unwrap();
        assert_eq!(ids[1].full_name(), "xenial/nightly");
    }

    #[test]
    fn test_sources_for() {
        let config = PublisherConfig::from_yaml(CONFIG).unwrap();
        let nightly = PublicationId::parse("nightly", "").unwrap();
        assert_eq!(config.sources_for(&nightly, "extra", ""), vec!["internal"]);
        assert!(config.sources_for(&nightly, "main", "").is_empty());

        let s3 = PublicationId::parse("s3:packages:nightly", "").unwrap();
        assert_eq!(config.sources_for(&s3, "main", ""), vec!["tools"]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PublisherConfig::load(&dir.path().join("publisher.yaml")).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("publisher.yaml");
        std::fs::write(&path, CONFIG).unwrap();
        assert_eq!(PublisherConfig::load(&path).unwrap().repo.len(), 2);
    }
}
