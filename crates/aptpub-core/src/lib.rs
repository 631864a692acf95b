//! aptpub Core - Core types for managing aptly publications
//!
//! This crate provides the foundational types used throughout aptpub:
//! - `PackageRef`: The package key exchanged with the remote service
//! - `DebVersion`: dpkg-compatible version ordering
//! - `PublicationId`: Storage/prefix/distribution identity of a publication
//! - `Composition` / `ResolvedSources`: Desired and published component state
//! - `SourceProvenance`: Lineage of merge snapshots
//! - `DumpDocument`: Portable publication manifest

pub mod package;
pub mod version;
pub mod identity;
pub mod composition;
pub mod provenance;
pub mod dump;
pub mod error;

pub use package::PackageRef;
pub use version::DebVersion;
pub use identity::PublicationId;
pub use composition::{Composition, ResolvedSources};
pub use provenance::{DescriptionProvenance, SourceProvenance, MERGE_MARKER};
pub use dump::{DumpComponent, DumpDocument, DumpPackage, DEFAULT_DUMP_PREFIX};
pub use error::{CoreError, Result};
