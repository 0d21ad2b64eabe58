//! Storage error types.

use applytrack_shared::types::BlobId;
use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Blob not found in storage.
    #[error("blob not found: {blob_id}")]
    NotFound {
        /// Identifier that was not found.
        blob_id: BlobId,
    },

    /// The backing medium is unreachable or rejected the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// A stored object does not match its recorded metadata.
    #[error("stored blob is corrupted: {0}")]
    Corrupted(String),

    /// The write handle was already committed or aborted.
    #[error("write handle for blob {0} is already closed")]
    HandleClosed(BlobId),
}

impl StorageError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(blob_id: BlobId) -> Self {
        Self::NotFound { blob_id }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Map an OpenDAL error raised while operating on `blob_id`.
    #[must_use]
    pub fn from_opendal(err: &opendal::Error, blob_id: BlobId) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound { blob_id },
            opendal::ErrorKind::ConfigInvalid => Self::Configuration(err.to_string()),
            _ => Self::Unavailable(err.to_string()),
        }
    }

    /// Returns true if the blob did not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::ConfigInvalid => Self::Configuration(err.to_string()),
            _ => Self::Unavailable(err.to_string()),
        }
    }
}
