//! Error types for scribe-core

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for scribe operations
pub type Result<T> = std::result::Result<T, ScribeError>;

/// Main error type for scribe operations
#[derive(Error, Debug)]
pub enum ScribeError {
    /// Configuration or hierarchy document could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backing document could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Identifier describes a type path the hierarchy does not allow
    #[error("Hierarchy violation: {0}")]
    Hierarchy(#[from] HierarchyViolation),

    /// Identifier could not be parsed in strict mode
    #[error("Identifier error: {0}")]
    Identifier(#[from] IdentifierError),

    /// Referenced note, node, task or file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller key missing or not accepted for the project
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request is well-formed but carries invalid input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Configuration errors, fatal at startup
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required configuration document is missing
    #[error("missing configuration document: {0}")]
    Missing(PathBuf),

    /// Document exists but could not be read
    #[error("failed to read {path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
    },

    /// Document could not be parsed
    #[error("malformed configuration document {path}: {message}")]
    Malformed {
        path: PathBuf,
        message: String,
    },

    /// Parsed document holds an invalid value
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Storage errors, recoverable per request
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backing document does not exist
    #[error("document not found: {0}")]
    Missing(PathBuf),

    /// IO failure reading or writing the document
    #[error("IO error on {path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
    },

    /// Document content is not valid for its format
    #[error("corrupt document {path}: {message}")]
    Corrupt {
        path: PathBuf,
        message: String,
    },

    /// Serialization of the in-memory document failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A previous save failed and the in-memory state no longer matches disk
    #[error("document {0} is out of sync with disk after a failed save")]
    OutOfSync(PathBuf),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            StorageError::Missing(path)
        } else {
            StorageError::Io {
                path,
                message: err.to_string(),
            }
        }
    }
}

/// First illegal parent/child pair found in a type path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyViolation {
    /// Parent type is not declared in the hierarchy
    #[error("type '{parent}' is not defined and cannot have children (found '{child}')")]
    UnknownParent {
        parent: String,
        child: String,
    },

    /// Child type is not among the parent's declared children
    #[error("'{child}' cannot be a child of '{parent}'")]
    IllegalChild {
        parent: String,
        child: String,
    },
}

/// Strict-mode identifier parse failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Text outside of `<type:name>` segments
    #[error("unexpected text {text:?} at offset {offset} in identifier")]
    Unconsumed {
        offset: usize,
        text: String,
    },
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for ScribeError {
    fn from(err: serde_json::Error) -> Self {
        ScribeError::Storage(StorageError::Serialization(err.to_string()))
    }
}
