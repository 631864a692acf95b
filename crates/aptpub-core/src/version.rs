//! Debian version ordering
//!
//! Versions have the form `[epoch:]upstream[-revision]` and are ordered the way
//! dpkg orders them, not lexically: `1.10` is newer than `1.9`, `1.0~rc1` is
//! older than `1.0`, and any epoch beats any upstream version.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{CoreError, Result};

/// A parsed Debian package version
#[derive(Debug, Clone)]
pub struct DebVersion {
    pub epoch: u64,
    pub upstream: String,
    pub revision: Option<String>,
}

impl DebVersion {
    /// Parse a version string
    ///
    /// Examples:
    /// - "1.2.3" → epoch=0, upstream="1.2.3", revision=None
    /// - "2:1.2.3" → epoch=2, upstream="1.2.3", revision=None
    /// - "1.2.3-4+deb12u1" → epoch=0, upstream="1.2.3", revision=Some("4+deb12u1")
    /// - "1:2.0-rc1-3" → epoch=1, upstream="2.0-rc1", revision=Some("3")
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |reason: &str| CoreError::InvalidVersion {
            version: s.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(invalid("empty version"));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(invalid("contains whitespace"));
        }

        let (epoch, rest) = match s.split_once(':') {
            Some((e, rest)) => {
                let epoch = e
                    .parse::<u64>()
                    .map_err(|_| invalid("epoch is not a number"))?;
                (epoch, rest)
            }
            None => (0, s),
        };

        let (upstream, revision) = match rest.rsplit_once('-') {
            Some((u, r)) => (u, Some(r.to_string())),
            None => (rest, None),
        };

        if upstream.is_empty() {
            return Err(invalid("empty upstream version"));
        }

        Ok(Self {
            epoch,
            upstream: upstream.to_string(),
            revision,
        })
    }

    /// Compare two versions using dpkg semantics
    pub fn compare(&self, other: &DebVersion) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| verrevcmp(&self.upstream, &other.upstream))
            .then_with(|| {
                verrevcmp(
                    self.revision.as_deref().unwrap_or(""),
                    other.revision.as_deref().unwrap_or(""),
                )
            })
    }
}

impl fmt::Display for DebVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.upstream)?;
        if let Some(revision) = &self.revision {
            write!(f, "-{}", revision)?;
        }
        Ok(())
    }
}

impl PartialEq for DebVersion {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for DebVersion {}

impl Ord for DebVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for DebVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort weight of a single character in a non-digit run
///
/// `~` sorts before everything (even the end of the string), letters sort
/// before other symbols.
fn order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => c as i32,
        Some(b'~') => -1,
        Some(c) => c as i32 + 256,
    }
}

fn is_digit_at(s: &[u8], i: usize) -> bool {
    s.get(i).is_some_and(u8::is_ascii_digit)
}

/// dpkg's version fragment comparison
fn verrevcmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0, 0);

    while i < a.len() || j < b.len() {
        while (i < a.len() && !a[i].is_ascii_digit()) || (j < b.len() && !b[j].is_ascii_digit()) {
            let ac = order(a.get(i).copied());
            let bc = order(b.get(j).copied());
            if ac != bc {
                return ac.cmp(&bc);
            }
            i += 1;
            j += 1;
        }

        while a.get(i) == Some(&b'0') {
            i += 1;
        }
        while b.get(j) == Some(&b'0') {
            j += 1;
        }

        let mut first_diff = Ordering::Equal;
        while is_digit_at(a, i) && is_digit_at(b, j) {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }

        if is_digit_at(a, i) {
            return Ordering::Greater;
        }
        if is_digit_at(b, j) {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }

    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> DebVersion {
        DebVersion::parse(s).unwrap()
    }

    #[test]
    fn test_parse_simple() {
        let version = v("1.2.3");
        assert_eq!(version.epoch, 0);
        assert_eq!(version.upstream, "1.2.3");
        assert_eq!(version.revision, None);
    }

    #[test]
    fn test_parse_full() {
        let version = v("1:2.0-rc1-3");
        assert_eq!(version.epoch, 1);
        assert_eq!(version.upstream, "2.0-rc1");
        assert_eq!(version.revision.as_deref(), Some("3"));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(DebVersion::parse("").is_err());
        assert!(DebVersion::parse("x:1.0").is_err());
        assert!(DebVersion::parse("1:-1").is_err());
        assert!(DebVersion::parse("1.0 2").is_err());
    }

    #[test]
    fn test_numeric_not_lexical() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("2.0") > v("1.99999"));
        assert!(v("10") > v("9"));
    }

    #[test]
    fn test_tilde_sorts_first() {
        assert!(v("1.0~rc1") < v("1.0"));
        assert!(v("1.0~~") < v("1.0~"));
        assert!(v("1.0~rc1") < v("1.0~rc2"));
        assert!(v("2.36-9+deb12u4~bpo") < v("2.36-9+deb12u4"));
    }

    #[test]
    fn test_epoch_wins() {
        assert!(v("1:0.1") > v("9.9"));
        assert!(v("2:1.0") > v("1:5.0"));
    }

    #[test]
    fn test_revision() {
        assert!(v("1.0-2") > v("1.0-1"));
        assert!(v("1.0-1") > v("1.0"));
        assert!(v("1.0-1+deb12u1") > v("1.0-1"));
    }

    #[test]
    fn test_letters_before_symbols() {
        assert!(v("1.0a") < v("1.0+"));
        assert!(v("1.0a") > v("1.0"));
    }

    #[test]
    fn test_leading_zeros_equal() {
        assert_eq!(v("1.01"), v("1.1"));
        assert_eq!(v("0:1.0"), v("1.0"));
    }

    #[test]
    fn test_display() {
        assert_eq!(v("1:2.0-3").to_string(), "1:2.0-3");
        assert_eq!(v("2.0").to_string(), "2.0");
    }
}
