//! Attachment service implementation.
//!
//! The pipelines live in sibling modules as further `impl` blocks:
//! `upload` (Upload Orchestrator), `download` (Download Streamer) and
//! `deletion` (Deletion Coordinator).

use std::sync::Arc;

use applytrack_shared::types::{ApplicationId, BlobId};
use tracing::{debug, error, instrument, warn};

use super::error::AttachmentError;
use super::registry::EntityRegistry;
use super::types::{DocumentReference, UploadPhase};
use super::validator::MAX_ATTACHMENT_BYTES;
use crate::storage::{StorageError, StorageService};

/// Attachment service tying the blob store to the entity registry.
pub struct AttachmentService<R: EntityRegistry> {
    pub(super) storage: Arc<StorageService>,
    pub(super) registry: Arc<R>,
    pub(super) max_upload_bytes: u64,
}

impl<R: EntityRegistry> AttachmentService<R> {
    /// Create a new attachment service.
    ///
    /// The upload ceiling is the store's configured maximum, capped at
    /// [`MAX_ATTACHMENT_BYTES`].
    #[must_use]
    pub fn new(storage: Arc<StorageService>, registry: Arc<R>) -> Self {
        let max_upload_bytes = storage.max_file_size().min(MAX_ATTACHMENT_BYTES);
        Self {
            storage,
            registry,
            max_upload_bytes,
        }
    }

    /// The blob store.
    #[must_use]
    pub fn storage(&self) -> &Arc<StorageService> {
        &self.storage
    }

    /// The entity registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// Largest upload accepted, in bytes.
    #[must_use]
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// List an application's attachments in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `AttachmentError::NotFound` if the application does not exist.
    #[instrument(skip(self), fields(%application_id))]
    pub async fn list(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<DocumentReference>, AttachmentError> {
        Ok(self.registry.list_attachments(application_id).await?)
    }

    /// Best-effort removal of a committed blob after a later step failed.
    ///
    /// Never fails. A blob that cannot be removed is logged at error level
    /// with its id so the orphan sweep can find it.
    pub(super) async fn compensate(&self, application_id: ApplicationId, blob_id: BlobId) {
        warn!(
            phase = %UploadPhase::Compensating,
            %application_id,
            %blob_id,
            "deleting committed blob after failed upload"
        );

        match self.storage.delete(blob_id).await {
            Ok(()) | Err(StorageError::NotFound { .. }) => {
                debug!(%blob_id, "compensation complete");
            }
            Err(err) => {
                error!(
                    %application_id,
                    %blob_id,
                    error = %err,
                    "compensation failed, orphaned blob left for sweep"
                );
            }
        }
    }
}
