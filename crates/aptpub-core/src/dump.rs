//! Dump document model
//!
//! A dump is a portable YAML manifest of everything a publication serves:
//! every component's snapshot and the full list of its packages. It is enough
//! to rebuild the snapshots later, as long as the packages still exist on the
//! remote service.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::package::PackageRef;

/// Default file name prefix for dumps
pub const DEFAULT_DUMP_PREFIX: &str = "saved-";

/// A saved publication manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpDocument {
    /// Full name of the dumped publication
    pub publish: String,

    /// Storage backend of the dumped publication
    #[serde(default)]
    pub storage: String,

    /// Timestamp tag of the run that produced the dump
    pub name: String,

    /// Saved components
    #[serde(default)]
    pub components: Vec<DumpComponent>,
}

/// One saved component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpComponent {
    pub component: String,
    pub snapshot: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub packages: Vec<DumpPackage>,
}

/// One saved package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpPackage {
    pub package: String,
    pub version: String,
    pub arch: String,

    /// Content id
    #[serde(rename = "ref")]
    pub id: String,

    /// Full package key, when the dump was written by this tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl DumpPackage {
    pub fn from_ref(reference: &PackageRef) -> Self {
        Self {
            package: reference.name().to_string(),
            version: reference.version().to_string(),
            arch: reference.arch().to_string(),
            id: reference.id().to_string(),
            key: Some(reference.to_string()),
        }
    }

    /// Re-encode the package key
    ///
    /// Falls back to rebuilding it from the decoded fields for documents that
    /// carry no `key`.
    pub fn to_ref(&self) -> Result<PackageRef> {
        match &self.key {
            Some(key) => PackageRef::parse(key),
            None => Ok(PackageRef::new(
                format!("P{}", self.arch),
                &self.package,
                &self.version,
                &self.id,
            )),
        }
    }
}

impl DumpComponent {
    /// Package keys of this component
    pub fn package_refs(&self) -> Result<Vec<PackageRef>> {
        self.packages.iter().map(DumpPackage::to_ref).collect()
    }
}

impl DumpDocument {
    /// Find a saved component
    pub fn component(&self, name: &str) -> Option<&DumpComponent> {
        self.components.iter().find(|c| c.component == name)
    }

    /// Load a document from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Save the document to a YAML file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// `{dir}/{prefix}{full name}.yml` with `/` and `:` replaced by `_`
    pub fn file_path(dir: &Path, prefix: &str, full_name: &str) -> PathBuf {
        dir.join(format!("{}{}.yml", prefix, full_name.replace(['/', ':'], "_")))
    }
}
