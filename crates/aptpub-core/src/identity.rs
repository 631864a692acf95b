//! Publication identity
//!
//! A publication is addressed by `{storage, prefix, distribution}`. The textual
//! form used on the command line and in dump documents is
//! `[<storage>:][<prefix>/]<distribution>`, e.g. `s3:mirror:xenial/nightly`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Prefix the remote service reports for publications at the storage root
pub const ROOT_PREFIX: &str = ".";

/// Identity of one publication on the remote service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicationId {
    /// Storage backend (`""` for the local filesystem, `s3:name`, `swift:name`)
    #[serde(default)]
    pub storage: String,

    /// Path prefix (`""` for the root)
    #[serde(default)]
    pub prefix: String,

    /// Distribution name
    pub distribution: String,
}

impl PublicationId {
    pub fn new(
        storage: impl Into<String>,
        prefix: impl Into<String>,
        distribution: impl Into<String>,
    ) -> Self {
        let prefix = prefix.into();
        Self {
            storage: storage.into(),
            prefix: normalize_prefix(&prefix),
            distribution: distribution.into(),
        }
    }

    /// Parse `[<storage>:][<prefix>/]<distribution>`
    ///
    /// The storage part may itself contain a colon (`s3:bucket`), so it is
    /// split off at the last colon. `default_storage` applies when the name
    /// carries no storage.
    pub fn parse(name: &str, default_storage: &str) -> Result<Self> {
        let invalid = |reason: &str| CoreError::InvalidPublicationName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let (storage, path) = match name.rsplit_once(':') {
            Some((storage, path)) => (storage, path),
            None => (default_storage, name),
        };

        let path = path.trim_matches('/');
        let (prefix, distribution) = match path.rsplit_once('/') {
            Some((prefix, distribution)) => (prefix, distribution),
            None => ("", path),
        };

        if distribution.is_empty() {
            return Err(invalid("missing distribution"));
        }

        Ok(Self::new(storage, prefix, distribution))
    }

    /// `[<storage>:][<prefix>/]<distribution>`
    pub fn full_name(&self) -> String {
        let mut name = String::new();
        if !self.storage.is_empty() {
            name.push_str(&self.storage);
            name.push(':');
        }
        if !self.prefix.is_empty() {
            name.push_str(&self.prefix);
            name.push('/');
        }
        name.push_str(&self.distribution);
        name
    }

    /// Name safe to embed in snapshot names (`/` and `:` become `-`)
    pub fn slug(&self) -> String {
        self.full_name().replace(['/', ':'], "-")
    }

    /// Prefix as the remote service reports it (`.` for the root)
    pub fn remote_prefix(&self) -> &str {
        if self.prefix.is_empty() {
            ROOT_PREFIX
        } else {
            &self.prefix
        }
    }

    /// `[<storage>:]<prefix>` path segment for API URLs
    ///
    /// Underscores are doubled and slashes become underscores, so that a
    /// multi-level prefix fits in a single path segment.
    pub fn api_prefix(&self) -> String {
        let escaped = if self.prefix.is_empty() {
            ROOT_PREFIX.to_string()
        } else {
            self.prefix.replace('_', "__").replace('/', "_")
        };

        if self.storage.is_empty() {
            escaped
        } else {
            format!("{}:{}", self.storage, escaped)
        }
    }

    /// Whether a publication reported by the remote service is this one
    pub fn matches_remote(&self, storage: &str, prefix: &str, distribution: &str) -> bool {
        self.storage == storage
            && self.prefix == normalize_prefix(prefix)
            && self.distribution == distribution
    }
}

impl fmt::Display for PublicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix == ROOT_PREFIX {
        String::new()
    } else {
        prefix.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_distribution_only() {
        let id = PublicationId::parse("nightly", "").unwrap();
        assert_eq!(id.storage, "");
        assert_eq!(id.prefix, "");
        assert_eq!(id.distribution, "nightly");
        assert_eq!(id.full_name(), "nightly");
        assert_eq!(id.remote_prefix(), ".");
        assert_eq!(id.api_prefix(), ".");
    }

    #[test]
    fn test_parse_with_prefix() {
        let id = PublicationId::parse("xenial/nightly", "").unwrap();
        assert_eq!(id.prefix, "xenial");
        assert_eq!(id.distribution, "nightly");
        assert_eq!(id.api_prefix(), "xenial");
    }

    #[test]
    fn test_parse_with_storage() {
        let id = PublicationId::parse("s3:mirror:xenial/nightly", "").unwrap();
        assert_eq!(id.storage, "s3:mirror");
        assert_eq!(id.prefix, "xenial");
        assert_eq!(id.full_name(), "s3:mirror:xenial/nightly");
        assert_eq!(id.api_prefix(), "s3:mirror:xenial");
        assert_eq!(id.slug(), "s3-mirror-xenial-nightly");
    }

    #[test]
    fn test_default_storage() {
        let id = PublicationId::parse("xenial/nightly", "s3:mirror").unwrap();
        assert_eq!(id.storage, "s3:mirror");
    }

    #[test]
    fn test_multi_level_prefix_escaping() {
        let id = PublicationId::parse("ubuntu/xenial_extra/nightly", "").unwrap();
        assert_eq!(id.prefix, "ubuntu/xenial_extra");
        assert_eq!(id.api_prefix(), "ubuntu_xenial__extra");
    }

    #[test]
    fn test_missing_distribution() {
        assert!(PublicationId::parse("", "").is_err());
        assert!(PublicationId::parse("s3:mirror:", "").is_err());
    }

    #[test]
    fn test_matches_remote_root_prefix() {
        let id = PublicationId::parse("nightly", "").unwrap();
        assert!(id.matches_remote("", ".", "nightly"));
        assert!(!id.matches_remote("", "xenial", "nightly"));
        assert!(!id.matches_remote("s3:x", ".", "nightly"));
    }
}
