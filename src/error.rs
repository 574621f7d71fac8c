//! Error types for repograph.

use thiserror::Error;

use crate::access::DenyReason;
use crate::model::ObjectId;
use crate::storage::Collection;

/// Main error type for repository graph operations.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    #[error("Annotation error: {0}")]
    Annotation(#[from] AnnotationError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RepoError {
    /// Whether the caller should retry the operation with a fresh read.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RepoError::Storage(StorageError::Conflict { .. }))
    }
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Document store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The store itself could not be reached. Never masked.
    #[error("Document store unreachable: {0}")]
    Unreachable(String),

    #[error("Write conflict on {collection}/{id}: expected revision {expected}, found {actual}")]
    Conflict {
        collection: Collection,
        id: ObjectId,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid reference {id}: expected a {expected} document, {reason}")]
    InvalidReference {
        id: ObjectId,
        expected: Collection,
        reason: String,
    },

    #[error("Not found: {collection}/{id}")]
    NotFound { collection: Collection, id: ObjectId },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced when a principal may not see an object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Precise reason, only reported to privileged callers.
    #[error("Access denied: {0}")]
    Denied(DenyReason),

    /// Uniform denial that does not disclose whether the object exists.
    #[error("Forbidden")]
    Forbidden,
}

/// Annotation list and target errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("Invalid annotation target: {0}")]
    InvalidTarget(String),

    #[error("Annotation {0} is already attached")]
    Duplicate(ObjectId),

    #[error("Annotation {0} is not in the list")]
    UnknownAnnotation(ObjectId),
}

/// Metadata merge errors.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Gave up on {collection}/{id} after {attempts} conflicting writes")]
    RetriesExhausted {
        collection: Collection,
        id: ObjectId,
        attempts: usize,
    },
}

/// Result type alias for repograph operations.
pub type Result<T> = std::result::Result<T, RepoError>;
