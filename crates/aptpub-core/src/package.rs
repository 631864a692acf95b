//! Package reference codec
//!
//! The remote service identifies every package build by a key of four
//! space-separated fields: `Pamd64 nginx 1.24.0-1 6f2c9a1e`. The first field is
//! the architecture as the service spells it (with its `P` marker), followed by
//! the package name, the Debian version and a content id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::version::DebVersion;

/// A decoded package reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageRef {
    architecture: String,
    name: String,
    version: String,
    id: String,
}

impl PackageRef {
    /// Build a reference from its four fields
    pub fn new(
        architecture: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            architecture: architecture.into(),
            name: name.into(),
            version: version.into(),
            id: id.into(),
        }
    }

    /// Parse a reference string into its four fields
    pub fn parse(reference: &str) -> Result<Self> {
        let fields: Vec<&str> = reference.split(' ').collect();
        if fields.len() != 4 || fields.iter().any(|f| f.is_empty()) {
            return Err(CoreError::MalformedReference {
                reference: reference.to_string(),
                fields: fields.len(),
            });
        }

        Ok(Self::new(fields[0], fields[1], fields[2], fields[3]))
    }

    /// Parse a batch of references, failing on the first malformed one
    pub fn parse_all<S: AsRef<str>>(references: &[S]) -> Result<Vec<Self>> {
        references.iter().map(|r| Self::parse(r.as_ref())).collect()
    }

    /// Architecture field exactly as encoded in the key
    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    /// Architecture without the service's `P` marker (`Pamd64` -> `amd64`)
    pub fn arch(&self) -> &str {
        self.architecture
            .strip_prefix('P')
            .filter(|a| !a.is_empty())
            .unwrap_or(&self.architecture)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Content id (hash of the package file set)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parsed Debian version of this package
    pub fn deb_version(&self) -> Result<DebVersion> {
        DebVersion::parse(&self.version)
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.architecture, self.name, self.version, self.id
        )
    }
}

impl FromStr for PackageRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PackageRef {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PackageRef> for String {
    fn from(value: PackageRef) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fields() {
        let r = PackageRef::parse("Pamd64 nginx 1.24.0-1 6f2c9a1e").unwrap();
        assert_eq!(r.architecture(), "Pamd64");
        assert_eq!(r.arch(), "amd64");
        assert_eq!(r.name(), "nginx");
        assert_eq!(r.version(), "1.24.0-1");
        assert_eq!(r.id(), "6f2c9a1e");
    }

    #[test]
    fn test_format_is_inverse_of_parse() {
        for key in [
            "Pamd64 nginx 1.24.0-1 6f2c9a1e",
            "Pall python3-six 1:1.16.0-4 aa",
            "amd64 foo 1.0 id1",
            "Pi386 libc6 2.36-9+deb12u4~bpo 0000",
        ] {
            assert_eq!(PackageRef::parse(key).unwrap().to_string(), key);
        }
    }

    #[test]
    fn test_wrong_field_count() {
        for key in ["", "Pamd64 nginx 1.0", "Pamd64 nginx 1.0 id extra", "Pamd64  nginx 1.0 id"] {
            let err = PackageRef::parse(key).unwrap_err();
            assert!(matches!(err, CoreError::MalformedReference { .. }), "{key}");
        }
    }

    #[test]
    fn test_arch_without_marker() {
        assert_eq!(PackageRef::new("amd64", "a", "1", "x").arch(), "amd64");
        assert_eq!(PackageRef::new("P", "a", "1", "x").arch(), "P");
        assert_eq!(PackageRef::new("powerpc", "a", "1", "x").arch(), "powerpc");
        assert_eq!(PackageRef::new("Ppowerpc", "a", "1", "x").arch(), "powerpc");
    }

    #[test]
    fn test_parse_all_stops_at_malformed() {
        let refs = vec!["Pamd64 a 1 x".to_string(), "broken".to_string()];
        assert!(PackageRef::parse_all(&refs).is_err());
        assert_eq!(PackageRef::parse_all(&refs[..1]).unwrap().len(), 1);
    }

    #[test]
    fn test_serde_as_string() {
        let r = PackageRef::new("Pamd64", "nginx", "1.0", "abc");
        let yaml = serde_yaml::to_string(&r).unwrap();
        assert_eq!(yaml.trim(), "Pamd64 nginx 1.0 abc");
        let back: PackageRef = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, r);
    }
}
