//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use aptpub_client::ClientError;
use aptpub_core::CoreError;
use aptpub_engine::EngineError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Invalid arguments or missing options
    #[error("{message}")]
    #[diagnostic(code(aptpub::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Publisher configuration cannot be used
    #[error("Configuration error: {message}")]
    #[diagnostic(code(aptpub::cli::config))]
    Config { message: String },

    /// Some publications failed during a publish-many run
    #[error("{failed} of {total} publication(s) failed")]
    #[diagnostic(code(aptpub::cli::publish))]
    Publish { failed: usize, total: usize },

    /// The aptly service refused a request or is unreachable
    #[error("{message}")]
    #[diagnostic(code(aptpub::cli::remote))]
    Remote {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(aptpub::cli::io))]
    Io { message: String },

    /// Cancelled with Ctrl-C
    #[error("Interrupted")]
    #[diagnostic(code(aptpub::cli::interrupted))]
    Interrupted,

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(aptpub::cli::error))]
    Other {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Publish { .. } => exit_codes::PUBLISH_ERROR,
            CliError::Remote { .. } => exit_codes::REMOTE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Interrupted => exit_codes::INTERRUPTED,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: None,
        }
    }

    /// Create a usage error with help text
    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    fn other(message: impl Into<String>, help: Option<&str>) -> Self {
        Self::Other {
            message: message.into(),
            help: help.map(str::to_string),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        let help = match &err {
            ClientError::InvalidUrl { .. } | ClientError::InvalidConfig { .. } => {
                return CliError::usage(err.to_string());
            }
            ClientError::CredentialNotFound { .. } => {
                Some("set APTLY_USER and APTLY_PASSWORD or pass --user/--password")
            }
            ClientError::Remote { status: 401, .. } => Some("check --user and --password"),
            ClientError::NetworkError { .. } => Some("is the aptly API server running?"),
            ClientError::Timeout { .. } => Some("raise the limit with --timeout"),
            ClientError::Io(_) => {
                return CliError::Io {
                    message: err.to_string(),
                };
            }
            _ => None,
        };
        CliError::Remote {
            message: err.to_string(),
            help: help.map(str::to_string),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(e) => e.into(),
            CoreError::InvalidPublicationName { .. } => CliError::usage(err.to_string()),
            _ => CliError::other(err.to_string(), None),
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Remote(e) => e.into(),
            EngineError::Core(e) => e.into(),
            EngineError::Cancelled => CliError::Interrupted,
            EngineError::Config(message) => CliError::Config { message },
            EngineError::InvalidPattern { .. } => CliError::usage(err.to_string()),
            EngineError::NoSuchPublication { .. } => CliError::other(
                err.to_string(),
                Some("list publications with `aptly publish list`"),
            ),
            EngineError::CorruptedRestoreDocument { .. } => CliError::other(
                err.to_string(),
                Some("the dump references packages that were removed from the pool"),
            ),
            _ => CliError::other(err.to_string(), None),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::usage("x").exit_code(), exit_codes::USAGE_ERROR);
        assert_eq!(
            CliError::Publish {
                failed: 1,
                total: 3
            }
            .exit_code(),
            exit_codes::PUBLISH_ERROR
        );
        assert_eq!(CliError::Interrupted.exit_code(), exit_codes::INTERRUPTED);
    }

    #[test]
    fn test_from_engine_error() {
        let err: CliError = EngineError::Config("bad".to_string()).into();
        assert!(matches!(err, CliError::Config { ref message } if message == "bad"));

        let err: CliError = EngineError::Cancelled.into();
        assert_eq!(err.exit_code(), exit_codes::INTERRUPTED);

        let remote = ClientError::Remote {
            status: 401,
            reason: "unauthorized".to_string(),
            method: "GET".to_string(),
            path: "/publish".to_string(),
        };
        let err: CliError = EngineError::Remote(remote).into();
        assert!(matches!(err, CliError::Remote { help: Some(_), .. }));
        assert_eq!(err.exit_code(), exit_codes::REMOTE_ERROR);
    }

    #[test]
    fn test_invalid_url_is_usage() {
        let err: CliError = ClientError::InvalidUrl {
            url: "ftp://x".to_string(),
            reason: "unsupported scheme".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::USAGE_ERROR);
    }
}
