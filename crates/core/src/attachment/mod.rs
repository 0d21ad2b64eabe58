//! Attachment management for job applications.
//!
//! This module provides the attachment pipelines:
//! - Validation of declared category, filename and media type
//! - Streamed upload with compensation when linking fails
//! - Streamed download with content metadata
//! - Blob-first deletion and per-application purge

mod deletion;
mod download;
mod error;
mod registry;
mod service;
#[cfg(test)]
mod testing;
mod types;
mod upload;
pub mod validator;

pub use error::{AttachmentError, NotFoundKind, ValidationError};
pub use registry::{EntityRegistry, MemoryRegistry, RegistryError};
pub use service::AttachmentService;
pub use types::{
    AttachmentDownload, AttachmentMetadata, ContentInfo, DocumentCategory, DocumentReference,
    FileKind, UploadPhase,
};
pub use upload::StagedUpload;
pub use validator::{MAX_ATTACHMENT_BYTES, ValidatedAttachment, ValidatedFile};
