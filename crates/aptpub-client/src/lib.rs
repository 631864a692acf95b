//! aptpub Client - Remote repository client for aptpub
//!
//! - `AptlyClient`: raw JSON request primitives over the aptly REST API
//! - `AptlyApi`: typed operations used by the publication engine
//! - `MockAptly`: in-memory implementation for tests
//! - `ClientConfig` / `Credentials`: connection settings

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod mock;

pub use api::{
    AptlyApi, CreatePublishRequest, CreateSnapshotRequest, PackageQuery,
    PublishSource, PublishedRepo, Snapshot, SnapshotDiffEntry, UpdatePublishRequest,
};
pub use config::{ClientConfig, Credentials, DEFAULT_TIMEOUT_SECS, ResolvedCredentials};
pub use error::{ClientError, Result};
pub use http::AptlyClient;
pub use mock::{MockAptly, OperationCounts};
