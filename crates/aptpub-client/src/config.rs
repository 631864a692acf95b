//! Client configuration
//!
//! The API endpoint and credentials can be given on the command line or stored
//! in `~/.config/aptpub/client.yaml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{ClientError, Result};

/// Default request timeout, large publishes can take minutes
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Connection settings for the remote repository service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the service, e.g. `http://localhost:8080`
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Log mutating requests instead of sending them
    #[serde(default)]
    pub dry_run: bool,

    /// Credentials (optional)
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ClientConfig {
    /// Create a configuration for a base URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        validate_url(&url)?;

        Ok(Self {
            url,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            dry_run: false,
            credentials: None,
        })
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Load configuration from the default location, if present
    pub fn load() -> Result<Option<Self>> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        validate_url(&config.url)?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| ClientError::InvalidConfig {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("aptpub").join("client.yaml"))
    }
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|e| ClientError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ClientError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}', expected http or https", scheme),
        }),
    }
}

/// Credential types supported
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Credentials {
    /// Basic authentication (username/password)
    Basic { username: String, password: String },

    /// Bearer token authentication (service behind an auth proxy)
    Bearer { token: String },

    /// Environment variable references (CI/CD friendly)
    Env {
        username_var: String,
        password_var: String,
    },
}

impl Credentials {
    /// Create basic auth credentials
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create bearer token credentials
    pub fn bearer(token: impl Into<String>) -> Self {
        Credentials::Bearer {
            token: token.into(),
        }
    }

    /// Create environment variable credentials
    pub fn from_env(username_var: impl Into<String>, password_var: impl Into<String>) -> Self {
        Credentials::Env {
            username_var: username_var.into(),
            password_var: password_var.into(),
        }
    }

    /// Resolve credentials to actual values
    pub fn resolve(&self) -> Result<ResolvedCredentials> {
        match self {
            Credentials::Basic { username, password } => Ok(ResolvedCredentials::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            Credentials::Bearer { token } => Ok(ResolvedCredentials::Bearer {
                token: token.clone(),
            }),
            Credentials::Env {
                username_var,
                password_var,
            } => {
                let username =
                    std::env::var(username_var).map_err(|_| ClientError::CredentialNotFound {
                        message: format!("Environment variable {} not set", username_var),
                    })?;
                let password =
                    std::env::var(password_var).map_err(|_| ClientError::CredentialNotFound {
                        message: format!("Environment variable {} not set", password_var),
                    })?;
                Ok(ResolvedCredentials::Basic { username, password })
            }
        }
    }
}

/// Resolved credentials ready for use
#[derive(Debug, Clone)]
pub enum ResolvedCredentials {
    Basic { username: String, password: String },
    Bearer { token: String },
}

impl ResolvedCredentials {
    /// Authorization header value
    pub fn auth_header(&self) -> String {
        match self {
            ResolvedCredentials::Basic { username, password } => {
                let encoded = base64::Engine::encode(
                    &base64::engine::general_purpose::STANDARD,
                    format!("{}:{}", username, password),
                );
                format!("Basic {}", encoded)
            }
            ResolvedCredentials::Bearer { token } => format!("Bearer {}", token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_url() {
        assert!(ClientConfig::new("http://localhost:8080").is_ok());
        assert!(ClientConfig::new("https://aptly.example.com").is_ok());
        assert!(ClientConfig::new("ftp://aptly.example.com").is_err());
        assert!(ClientConfig::new("localhost").is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let config = ClientConfig::new("http://localhost:8080")
            .unwrap()
            .with_timeout(30)
            .with_dry_run(true);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.dry_run);
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.yaml");

        let config = ClientConfig::new("http://localhost:8080")
            .unwrap()
            .with_credentials(Credentials::basic("admin", "secret"));
        config.save_to(&path).unwrap();

        let loaded = ClientConfig::load_from(&path).unwrap();
        assert_eq!(loaded.url, "http://localhost:8080");
        assert_eq!(loaded.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(matches!(loaded.credentials, Some(Credentials::Basic { .. })));
    }

    #[test]
    fn test_config_file_minimal() {
        let config: ClientConfig = serde_yaml::from_str("url: http://aptly:8080\n").unwrap();
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_basic_auth_header() {
        let resolved = Credentials::basic("user", "pass").resolve().unwrap();
        assert_eq!(resolved.auth_header(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_bearer_auth_header() {
        let resolved = Credentials::bearer("tok").resolve().unwrap();
        assert_eq!(resolved.auth_header(), "Bearer tok");
    }

    #[test]
    fn test_env_credentials() {
        // SAFETY: Test runs in single thread, no concurrent access to env vars
        unsafe {
            std::env::set_var("APTPUB_TEST_USER_VAR", "testuser");
            std::env::set_var("APTPUB_TEST_PASS_VAR", "testpass");
        }

        let env_creds = Credentials::from_env("APTPUB_TEST_USER_VAR", "APTPUB_TEST_PASS_VAR");
        match env_creds.resolve().unwrap() {
            ResolvedCredentials::Basic { username, password } => {
                assert_eq!(username, "testuser");
                assert_eq!(password, "testpass");
            }
            _ => panic!("Expected Basic credentials"),
        }

        // SAFETY: Test runs in single thread, no concurrent access to env vars
        unsafe {
            std::env::remove_var("APTPUB_TEST_USER_VAR");
            std::env::remove_var("APTPUB_TEST_PASS_VAR");
        }
    }

    #[test]
    fn test_env_credentials_missing() {
        let creds = Credentials::from_env("APTPUB_TEST_MISSING_USER", "APTPUB_TEST_MISSING_PASS");
        assert!(matches!(
            creds.resolve(),
            Err(ClientError::CredentialNotFound { .. })
        ));
    }
}
