//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Malformed package reference '{reference}': expected 4 space-separated fields, found {fields}")]
    MalformedReference { reference: String, fields: usize },

    #[error("Invalid Debian version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("Invalid publication name '{name}': {reason}")]
    InvalidPublicationName { name: String, reason: String },

    #[error("Failed to parse dump document: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
