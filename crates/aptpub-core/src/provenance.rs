//! Source provenance of merge snapshots
//!
//! The remote service keeps no lineage for snapshots that were created from a
//! plain list of package refs. The source snapshots of a merge are therefore
//! recorded in the snapshot description and read back from it.

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker that opens every merge-snapshot description
pub const MERGE_MARKER: &str = "Merged from sources:";

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"'([^']+)'").expect("valid regex"));

/// Records which snapshots a merge snapshot was built from
pub trait SourceProvenance: Send + Sync {
    /// Encode a source list into a snapshot description
    fn encode(&self, sources: &[String]) -> String;

    /// Decode the source list from a description
    ///
    /// Returns `None` when the description carries no provenance.
    fn decode(&self, description: &str) -> Option<Vec<String>>;
}

/// Provenance stored as `Merged from sources: 'a', 'b'`
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptionProvenance;

impl SourceProvenance for DescriptionProvenance {
    fn encode(&self, sources: &[String]) -> String {
        let quoted: Vec<String> = sources.iter().map(|s| format!("'{}'", s)).collect();
        format!("{} {}", MERGE_MARKER, quoted.join(", "))
    }

    fn decode(&self, description: &str) -> Option<Vec<String>> {
        let rest = description.trim_start().strip_prefix(MERGE_MARKER)?;
        let sources: Vec<String> = QUOTED
            .captures_iter(rest)
            .map(|c| c[1].to_string())
            .collect();
        if sources.is_empty() {
            None
        } else {
            Some(sources)
        }
    }
}
