//! Attachment error types.

use std::fmt;

use applytrack_shared::error::AppError;
use applytrack_shared::types::{ApplicationId, BlobId, DocumentId};
use thiserror::Error;

use super::registry::RegistryError;
use crate::storage::StorageError;

/// A declared field the validator rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Category is not one of the closed set.
    #[error("invalid document type '{0}', must be one of: resume, coverLetter, offerLetter")]
    UnknownCategory(String),

    /// Filename is empty after sanitization.
    #[error("filename is empty")]
    EmptyFilename,

    /// Filename has no extension.
    #[error("filename '{0}' has no extension")]
    MissingExtension(String),

    /// Extension is outside the allowed set.
    #[error("file extension '.{0}' is not allowed, only PDF, DOC, DOCX and TXT files are accepted")]
    UnsupportedExtension(String),

    /// Media type is outside the allowed set.
    #[error("media type '{0}' is not allowed")]
    UnsupportedMediaType(String),

    /// Media type and extension name different kinds.
    #[error("media type '{declared}' does not match a .{extension} file, expected {expected}")]
    MediaTypeMismatch {
        /// Declared media type, normalized.
        declared: String,
        /// Extension from the filename.
        extension: &'static str,
        /// Media type the extension requires.
        expected: &'static str,
    },
}

/// What could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    /// The owning application.
    Entity(ApplicationId),
    /// A document reference on the application.
    Reference(DocumentId),
    /// The blob behind a reference.
    Blob(BlobId),
}

impl fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(id) => write!(f, "application {id}"),
            Self::Reference(id) => write!(f, "document {id}"),
            Self::Blob(id) => write!(f, "blob {id}"),
        }
    }
}

/// Attachment operation errors.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// A declared field was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Content exceeded the size ceiling.
    #[error("file exceeds the {limit} byte limit")]
    SizeLimitExceeded {
        /// The ceiling in bytes.
        limit: u64,
    },

    /// Entity, reference, or blob does not exist.
    #[error("{0} not found")]
    NotFound(NotFoundKind),

    /// Blob store failure.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// Entity registry failure.
    #[error("registry error: {0}")]
    Registry(String),

    /// The caller's byte stream failed before completion.
    #[error("upload interrupted: {0}")]
    Interrupted(String),
}

impl AttachmentError {
    /// Returns true if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<StorageError> for AttachmentError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { blob_id } => Self::NotFound(NotFoundKind::Blob(blob_id)),
            other => Self::Storage(other),
        }
    }
}

impl From<RegistryError> for AttachmentError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::EntityNotFound(id) => Self::NotFound(NotFoundKind::Entity(id)),
            RegistryError::ReferenceNotFound(id) => Self::NotFound(NotFoundKind::Reference(id)),
            RegistryError::Backend(msg) => Self::Registry(msg),
        }
    }
}

impl From<AttachmentError> for AppError {
    fn from(err: AttachmentError) -> Self {
        match err {
            AttachmentError::Validation(e) => Self::Validation(e.to_string()),
            AttachmentError::Interrupted(msg) => Self::Validation(format!("upload interrupted: {msg}")),
            AttachmentError::SizeLimitExceeded { limit } => {
                Self::PayloadTooLarge(format!("file exceeds the {limit} byte limit"))
            }
            AttachmentError::NotFound(kind) => Self::NotFound(kind.to_string()),
            AttachmentError::Storage(StorageError::Unavailable(msg)) => {
                Self::StorageUnavailable(msg)
            }
            AttachmentError::Storage(e) => Self::Internal(e.to_string()),
            AttachmentError::Registry(msg) => Self::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_not_found_becomes_blob_not_found() {
        let blob_id = BlobId::new();
        let err: AttachmentError = StorageError::not_found(blob_id).into();
        assert!(matches!(err, AttachmentError::NotFound(NotFoundKind::Blob(id)) if id == blob_id));
    }

    #[test]
    fn test_registry_errors_map_to_kinds() {
        let app = ApplicationId::new();
        let err: AttachmentError = RegistryError::EntityNotFound(app).into();
        assert!(matches!(err, AttachmentError::NotFound(NotFoundKind::Entity(id)) if id == app));

        let err: AttachmentError = RegistryError::Backend("connection reset".into()).into();
        assert!(matches!(err, AttachmentError::Registry(_)));
    }

    #[test]
    fn test_app_error_status_codes() {
        let cases: Vec<(AttachmentError, u16)> = vec![
            (ValidationError::UnknownCategory("x".into()).into(), 400),
            (AttachmentError::SizeLimitExceeded { limit: 5 }, 413),
            (AttachmentError::NotFound(NotFoundKind::Reference(DocumentId::new())), 404),
            (StorageError::unavailable("down").into(), 503),
            (AttachmentError::Registry("down".into()), 500),
            (AttachmentError::Interrupted("reset".into()), 400),
        ];

        for (err, status) in cases {
            let message = err.to_string();
            assert_eq!(AppError::from(err).status_code(), status, "{message}");
        }
    }

    #[test]
    fn test_unknown_category_message_lists_allowed_values() {
        let err = ValidationError::UnknownCategory("invalid".into());
        assert!(err.to_string().contains("resume, coverLetter, offerLetter"));
    }
}
