//! Deletion coordination.
//!
//! The blob is always deleted before the reference is unlinked. A failure
//! between the two steps leaves a stale reference to a missing blob, which
//! downloads report as `NotFound`. The reverse order could leave content
//! the caller believes is gone.

use applytrack_shared::types::{ApplicationId, DocumentId};
use tracing::{error, info, instrument, warn};

use super::error::{AttachmentError, NotFoundKind};
use super::registry::EntityRegistry;
use super::service::AttachmentService;
use super::types::DocumentReference;
use crate::storage::StorageError;

impl<R: EntityRegistry> AttachmentService<R> {
    /// Remove an attachment and its blob.
    ///
    /// A blob that is already gone counts as deleted, so a retry after a
    /// partial failure completes the unlink.
    ///
    /// # Errors
    ///
    /// Returns `AttachmentError::NotFound` if the application or reference
    /// does not exist, `AttachmentError::Storage` if the blob could not be
    /// deleted (the reference stays linked), or `AttachmentError::Registry`
    /// if the unlink failed after the blob was deleted.
    #[instrument(skip(self), fields(%application_id, %document_id))]
    pub async fn remove(
        &self,
        application_id: ApplicationId,
        document_id: DocumentId,
    ) -> Result<DocumentReference, AttachmentError> {
        let reference = self
            .registry
            .get_attachment(application_id, document_id)
            .await?;
        let blob_id = reference.blob_id;

        match self.storage.delete(blob_id).await {
            Ok(()) => {}
            Err(StorageError::NotFound { .. }) => {
                warn!(%blob_id, "blob already missing, unlinking reference");
            }
            Err(err) => return Err(err.into()),
        }

        let removed = self
            .registry
            .remove_attachment(application_id, document_id)
            .await
            .inspect_err(|err| {
                error!(%blob_id, error = %err, "blob deleted but reference still linked");
            })?;

        info!(%blob_id, category = %removed.category, "attachment removed");
        Ok(removed)
    }

    /// Remove every attachment of an application.
    ///
    /// Must run before the application record itself is deleted. Stops at
    /// the first blob that cannot be deleted, leaving that reference and the
    /// ones after it linked.
    ///
    /// # Errors
    ///
    /// Returns the first error other than a reference that was removed
    /// concurrently.
    #[instrument(skip(self), fields(%application_id))]
    pub async fn purge(&self, application_id: ApplicationId) -> Result<usize, AttachmentError> {
        let references = self.registry.list_attachments(application_id).await?;
        let mut removed = 0;

        for reference in references {
            match self.remove(application_id, reference.id).await {
                Ok(_) => removed += 1,
                Err(AttachmentError::NotFound(NotFoundKind::Reference(_))) => {}
                Err(err) => return Err(err),
            }
        }

        info!(removed, "attachments purged");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::testing::{FlakyRegistry, chunked, memory_service};
    use crate::storage::{StorageConfig, StorageProvider, StorageService};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_upload_download_remove_scenario() {
        let (service, app) = memory_service();
        let reference = service
            .upload(app, "resume", "resume.pdf", "application/pdf", chunked(b"0123456789", 4))
            .await
            .unwrap();
        assert_eq!(service.list(app).await.unwrap().len(), 1);

        let data = service.storage().read_to_end(reference.blob_id).await.unwrap();
        assert_eq!(data, b"0123456789");

        let removed = service.remove(app, reference.id).await.unwrap();
        assert_eq!(removed, reference);

        assert!(matches!(
            service.download(app, reference.id).await,
            Err(AttachmentError::NotFound(NotFoundKind::Reference(_)))
        ));
        assert!(
            service
                .storage()
                .stat(reference.blob_id)
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(service.list(app).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_reference() {
        let (service, app) = memory_service();
        let missing = DocumentId::new();

        let err = service.remove(app, missing).await.unwrap_err();
        assert!(matches!(err, AttachmentError::NotFound(NotFoundKind::Reference(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_remove_with_missing_blob_still_unlinks() {
        let (service, app) = memory_service();
        let reference = service
            .upload(app, "resume", "cv.txt", "text/plain", chunked(b"cv", 1))
            .await
            .unwrap();
        service.storage().delete(reference.blob_id).await.unwrap();

        service.remove(app, reference.id).await.unwrap();
        assert!(service.list(app).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_unlink_leaves_stale_reference_then_retry_completes() {
        let registry = Arc::new(FlakyRegistry::default());
        let app = ApplicationId::new();
        registry.inner.register(app);
        let storage = Arc::new(
            StorageService::from_config(StorageConfig::new(StorageProvider::Memory)).unwrap(),
        );
        let service = AttachmentService::new(storage, Arc::clone(&registry));

        let reference = service
            .upload(app, "resume", "cv.pdf", "application/pdf", chunked(b"cv bytes", 3))
            .await
            .unwrap();

        registry.fail_removes(true);
        let err = service.remove(app, reference.id).await.unwrap_err();
        assert!(matches!(err, AttachmentError::Registry(_)));

        // Blob is gone, reference is stale and reads report NotFound.
        assert_eq!(service.list(app).await.unwrap().len(), 1);
        assert!(matches!(
            service.download(app, reference.id).await,
            Err(AttachmentError::NotFound(NotFoundKind::Blob(_)))
        ));

        registry.fail_removes(false);
        service.remove(app, reference.id).await.unwrap();
        assert!(service.list(app).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_removes_everything() {
        let (service, app) = memory_service();
        let mut blob_ids = Vec::new();
        for (category, name) in [
            ("resume", "cv.pdf"),
            ("coverLetter", "letter.pdf"),
            ("offerLetter", "offer.pdf"),
        ] {
            let reference = service
                .upload(app, category, name, "application/pdf", chunked(b"content", 3))
                .await
                .unwrap();
            blob_ids.push(reference.blob_id);
        }

        assert_eq!(service.purge(app).await.unwrap(), 3);
        assert!(service.list(app).await.unwrap().is_empty());
        for blob_id in blob_ids {
            assert!(!service.storage().exists(blob_id).await.unwrap());
        }
        assert!(service.storage().list_blob_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_unknown_entity() {
        let (service, _) = memory_service();
        let missing = ApplicationId::new();
        assert!(matches!(
            service.purge(missing).await,
            Err(AttachmentError::NotFound(NotFoundKind::Entity(_)))
        ));
    }
}
