//! Error types for aptpub-engine

use aptpub_client::ClientError;
use aptpub_core::CoreError;
use thiserror::Error;

/// Result type for aptpub-engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while managing publications
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Publication does not exist on the remote service
    #[error("publication '{name}' does not exist")]
    NoSuchPublication { name: String },

    /// Remote service refused a request
    #[error("remote error: {0}")]
    Remote(#[from] ClientError),

    /// Invalid reference, version or document
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Publication has components that were never merged
    #[error("publication '{name}' has no resolved sources\nHint: merge the publication before publishing it")]
    Unresolved { name: String },

    /// Dump document references packages or snapshots that cannot be rebuilt
    #[error("corrupted restore document: component '{component}' (snapshot '{snapshot}'): {reason}")]
    CorruptedRestoreDocument {
        component: String,
        snapshot: String,
        reason: String,
    },

    /// Requested component is not part of the publication or document
    #[error("component '{component}' not found in '{publication}'")]
    ComponentNotFound {
        component: String,
        publication: String,
    },

    /// Package allow-list matched nothing
    #[error("no packages matching {packages} found in '{source_name}' (components: {components})")]
    NoPackagesPromoted {
        packages: String,
        source_name: String,
        components: String,
    },

    /// Invalid publication regex or target template
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Operation cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid publisher configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// HTTP status of the underlying remote failure
    pub fn status(&self) -> Option<u16> {
        match self {
            EngineError::Remote(e) => e.status(),
            _ => None,
        }
    }

    pub(crate) fn component_not_found(component: &str, publication: impl ToString) -> Self {
        EngineError::ComponentNotFound {
            component: component.to_string(),
            publication: publication.to_string(),
        }
    }
}
