//! Error types for remote repository operations

use thiserror::Error;

/// Remote repository client errors
#[derive(Debug, Error)]
pub enum ClientError {
    // ============ Configuration Errors ============
    #[error("Invalid API URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid client configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Credential not found: {message}")]
    CredentialNotFound { message: String },

    // ============ Remote Errors ============
    #[error("{method} {path} failed: {reason} ({status})")]
    Remote {
        status: u16,
        reason: String,
        method: String,
        path: String,
    },

    // ============ Network Errors ============
    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for remote repository operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// HTTP status of a remote failure
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The resource already exists (400 or 409 on create)
    pub fn is_conflict(&self) -> bool {
        matches!(self.status(), Some(400 | 409))
    }

    /// The resource, or something it references, does not exist
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The resource is still referenced and cannot be deleted
    pub fn is_in_use(&self) -> bool {
        self.status() == Some(409)
    }

    pub(crate) fn remote(status: u16, reason: impl Into<String>, method: &str, path: &str) -> Self {
        ClientError::Remote {
            status,
            reason: reason.into(),
            method: method.to_string(),
            path: path.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout { seconds: 0 }
        } else if e.is_connect() {
            ClientError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            ClientError::Remote {
                status: status.as_u16(),
                reason: e.to_string(),
                method: String::new(),
                path: e.url().map(|u| u.path().to_string()).unwrap_or_default(),
            }
        } else {
            ClientError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_yaml::Error> for ClientError {
    fn from(e: serde_yaml::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(e: url::ParseError) -> Self {
        ClientError::InvalidUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_helpers() {
        let conflict = ClientError::remote(400, "already exists", "POST", "/snapshots");
        assert!(conflict.is_conflict());
        assert!(!conflict.is_in_use());

        let in_use = ClientError::remote(409, "in use", "DELETE", "/snapshots/a");
        assert!(in_use.is_conflict());
        assert!(in_use.is_in_use());

        let missing = ClientError::remote(404, "not found", "PUT", "/publish/./nightly");
        assert!(missing.is_not_found());
        assert_eq!(missing.status(), Some(404));

        let net = ClientError::NetworkError { message: "down".into() };
        assert_eq!(net.status(), None);
        assert!(!net.is_conflict());
    }

    #[test]
    fn test_remote_display_names_request() {
        let err = ClientError::remote(500, "boom", "GET", "/publish");
        assert_eq!(err.to_string(), "GET /publish failed: boom (500)");
    }
}
