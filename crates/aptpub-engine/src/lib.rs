//! aptpub Engine - Publication composition and promotion for aptly
//!
//! This crate provides:
//! - **Publication**: desired, resolved and remote composition of one publication
//! - **Merge**: one deduplicated snapshot per component, reused when it already exists
//! - **Reconcile**: create, update or recreate the remote publication
//! - **Compare**: composition diff and package-level promotion reports
//! - **Promote**: copy components or selected packages between publications
//! - **Purge**: keep only the latest version of every package
//! - **Restore**: dump publications to YAML and rebuild them with rollback
//! - **Manager**: publish many publications concurrently, cleanup, bulk load

pub mod cancel;
pub mod compare;
pub mod config;
pub mod error;
pub mod manager;
pub mod merge;
pub mod promote;
pub mod publication;
pub mod purge;
pub mod reconcile;
pub mod restore;

pub use cancel::CancelFlag;
pub use compare::{
    ChangeKind, Comparison, ComponentReport, PackageChange, compare, compare_compositions,
    diff_report,
};
pub use config::{DEFAULT_CONFIG_PATH, PublisherConfig, SourceEntry, SourceKind};
pub use error::{EngineError, Result};
pub use manager::{
    CleanupReport, DEFAULT_CONCURRENCY, LoadedPublication, PublishManager, PublishOptions,
    PublishSummary, SourceFilter,
};
pub use merge::{merge, merge_prefix};
pub use promote::{PromoteOutcome, PromoteRequest, promote, promote_components, promote_packages};
pub use publication::Publication;
pub use purge::{ComponentPurge, PurgeOptions, PurgeReport, minimal_packages, purge};
pub use reconcile::{
    Action, ReconcileOutcome, ReconcilePolicy, RemoteState, observe, plan, reconcile,
};
pub use restore::{RESTORED_PREFIX, SnapshotContents, dump, dump_document, restore};
