//! Attachment types and data structures.

use std::fmt;

use applytrack_shared::types::{BlobId, DocumentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{BlobRecord, ByteStream};

/// Document category. A closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentCategory {
    /// Resume / CV.
    Resume,
    /// Cover letter.
    CoverLetter,
    /// Offer letter received from the employer.
    OfferLetter,
}

impl DocumentCategory {
    /// Every category, in display order.
    pub const ALL: [Self; 3] = [Self::Resume, Self::CoverLetter, Self::OfferLetter];

    /// Wire name of the category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::CoverLetter => "coverLetter",
            Self::OfferLetter => "offerLetter",
        }
    }

    /// Parse a wire name. Matching is exact.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allowed document file kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Portable Document Format.
    Pdf,
    /// Legacy Word document.
    Doc,
    /// Office Open XML Word document.
    Docx,
    /// Plain text.
    Txt,
}

impl FileKind {
    /// Every allowed kind.
    pub const ALL: [Self; 4] = [Self::Pdf, Self::Doc, Self::Docx, Self::Txt];

    /// Lowercase extension without the dot.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }

    /// Media type this kind must be declared with.
    #[must_use]
    pub const fn media_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Doc => "application/msword",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Txt => "text/plain",
        }
    }

    /// Look up a kind by extension, ignoring ASCII case.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.extension().eq_ignore_ascii_case(ext))
    }

    /// Look up a kind by its normalized media type.
    #[must_use]
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.media_type() == media_type)
    }
}

/// Metadata linking an application to one stored blob.
///
/// Immutable once linked: it is created by the upload pipeline after the
/// blob commits and removed whole by the deletion pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    /// Reference identifier.
    pub id: DocumentId,
    /// Document category.
    pub category: DocumentCategory,
    /// Original (sanitized) filename.
    pub filename: String,
    /// Backing blob. Owned by exactly one reference.
    pub blob_id: BlobId,
    /// Link timestamp.
    pub uploaded_at: DateTime<Utc>,
}

impl DocumentReference {
    /// Create a reference for a freshly committed blob.
    #[must_use]
    pub fn new(category: DocumentCategory, filename: impl Into<String>, blob_id: BlobId) -> Self {
        Self {
            id: DocumentId::new(),
            category,
            filename: filename.into(),
            blob_id,
            uploaded_at: Utc::now(),
        }
    }
}

/// Content metadata a transport needs to set response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentInfo {
    /// Media type of the stored bytes.
    pub media_type: String,
    /// Length in bytes.
    pub length: u64,
    /// Original filename.
    pub filename: String,
}

/// An attachment being streamed back to a caller.
pub struct AttachmentDownload {
    /// Header metadata.
    pub content: ContentInfo,
    /// The bytes.
    pub stream: ByteStream,
}

impl fmt::Debug for AttachmentDownload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentDownload")
            .field("content", &self.content)
            .finish_non_exhaustive()
    }
}

/// A reference together with the record of its backing blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentMetadata {
    /// The document reference.
    pub reference: DocumentReference,
    /// The committed blob.
    pub blob: BlobRecord,
}

/// Phases of one upload attempt, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    /// Bytes are streaming into the blob store.
    Receiving,
    /// Declared fields are being checked.
    Validating,
    /// The blob is being finalized.
    Committing,
    /// The reference is being appended to the application.
    Linking,
    /// A committed blob is being removed after a later failure.
    Compensating,
    /// The reference is visible.
    Done,
    /// The attempt failed.
    Failed,
}

impl UploadPhase {
    /// Lowercase phase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Receiving => "receiving",
            Self::Validating => "validating",
            Self::Committing => "committing",
            Self::Linking => "linking",
            Self::Compensating => "compensating",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
