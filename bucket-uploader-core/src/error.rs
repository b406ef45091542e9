//! Error types for the upload pipeline.
//!
//! Errors come in two tiers. [`BatchError`] aborts a whole run before any item
//! is touched. [`ItemError`] is captured into the batch report for the single
//! item it belongs to and never stops sibling items.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by an [`crate::contract::ObjectStore`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectStoreError {
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

/// Errors that prevent a batch from producing a report at all.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("bucket '{bucket}' does not exist or you don't have access to it")]
    BucketNotFound { bucket: String },

    #[error("access denied to bucket '{bucket}'; check your credentials and permissions")]
    AccessDenied { bucket: String },

    #[error("error accessing bucket '{bucket}': {message}")]
    BucketCheck { bucket: String, message: String },
}

impl BatchError {
    /// Maps a failed bucket-access check onto the matching whole-batch error.
    pub fn from_bucket_check(bucket: &str, err: ObjectStoreError) -> Self {
        let bucket = bucket.to_string();
        match err {
            ObjectStoreError::NotFound(_) => BatchError::BucketNotFound { bucket },
            ObjectStoreError::AccessDenied(_) => BatchError::AccessDenied { bucket },
            ObjectStoreError::Other(message) => BatchError::BucketCheck { bucket, message },
        }
    }
}

/// Per-item failures. Rendered into [`crate::report::UploadFailure::error`].
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("no content found")]
    NoContent,

    #[error("file does not exist: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("path is not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path '{0}' leaves an empty destination key")]
    EmptyKey(String),

    #[error("failed to create staging file: {0}")]
    Staging(#[source] std::io::Error),

    #[error("upload failed: {0}")]
    Upload(#[from] ObjectStoreError),

    #[error("upload timed out after {0:?}")]
    Timeout(Duration),
}

/// Raised while substituting tokens into a naming template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown template token '{{{0}}}'")]
    UnknownToken(String),

    #[error("unbalanced '{{' or '}}' at byte {0}")]
    Unbalanced(usize),

    #[error("template produced an empty name")]
    Empty,
}
