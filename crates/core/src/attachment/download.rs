//! Download streaming.

use applytrack_shared::types::{ApplicationId, DocumentId};
use tracing::{debug, error, instrument};

use super::error::AttachmentError;
use super::registry::EntityRegistry;
use super::service::AttachmentService;
use super::types::{AttachmentDownload, AttachmentMetadata, ContentInfo};

impl<R: EntityRegistry> AttachmentService<R> {
    /// Stream an attachment back with the metadata a transport needs.
    ///
    /// A reference whose blob is missing is an inconsistency: it is logged
    /// and surfaced as `NotFound`, never served as empty content.
    ///
    /// # Errors
    ///
    /// Returns `AttachmentError::NotFound` if the application, the reference
    /// or the blob does not exist, or `AttachmentError::Storage` if the store
    /// cannot be read.
    #[instrument(skip(self), fields(%application_id, %document_id))]
    pub async fn download(
        &self,
        application_id: ApplicationId,
        document_id: DocumentId,
    ) -> Result<AttachmentDownload, AttachmentError> {
        let reference = self
            .registry
            .get_attachment(application_id, document_id)
            .await?;

        let (blob, stream) = self
            .storage
            .open(reference.blob_id)
            .await
            .inspect_err(|err| {
                if err.is_not_found() {
                    error!(blob_id = %reference.blob_id, "reference points at a missing blob");
                }
            })?;

        debug!(blob_id = %blob.id, length = blob.length, "streaming attachment");

        Ok(AttachmentDownload {
            content: ContentInfo {
                media_type: blob.media_type,
                length: blob.length,
                filename: reference.filename,
            },
            stream,
        })
    }

    /// Look up a reference together with its blob record.
    ///
    /// # Errors
    ///
    /// Returns `AttachmentError::NotFound` if the application, the reference
    /// or the blob does not exist.
    #[instrument(skip(self), fields(%application_id, %document_id))]
    pub async fn metadata(
        &self,
        application_id: ApplicationId,
        document_id: DocumentId,
    ) -> Result<AttachmentMetadata, AttachmentError> {
        let reference = self
            .registry
            .get_attachment(application_id, document_id)
            .await?;
        let blob = self.storage.stat(reference.blob_id).await?;
        Ok(AttachmentMetadata { reference, blob })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::error::NotFoundKind;
    use crate::attachment::testing::{chunked, memory_service};
    use bytes::Bytes;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_download_returns_uploaded_bytes() {
        let (service, app) = memory_service();
        let reference = service
            .upload(app, "resume", "cv.PDF", "application/pdf", chunked(b"0123456789", 4))
            .await
            .unwrap();

        let download = service.download(app, reference.id).await.unwrap();
        assert_eq!(
            download.content,
            ContentInfo {
                media_type: "application/pdf".to_string(),
                length: 10,
                filename: "cv.PDF".to_string(),
            }
        );

        let chunks: Vec<Bytes> = download.stream.map(Result::unwrap).collect().await;
        assert_eq!(chunks.concat(), b"0123456789");
    }

    #[tokio::test]
    async fn test_download_stores_canonical_media_type() {
        let (service, app) = memory_service();
        let reference = service
            .upload(app, "coverLetter", "note.txt", "Text/Plain; charset=utf-8", chunked(b"hi", 1))
            .await
            .unwrap();

        let download = service.download(app, reference.id).await.unwrap();
        assert_eq!(download.content.media_type, "text/plain");
    }

    #[tokio::test]
    async fn test_download_unknown_reference() {
        let (service, app) = memory_service();
        let missing = DocumentId::new();

        let err = service.download(app, missing).await.unwrap_err();
        assert!(matches!(err, AttachmentError::NotFound(NotFoundKind::Reference(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_download_unknown_entity() {
        let (service, _) = memory_service();
        let missing = ApplicationId::new();

        let err = service.download(missing, DocumentId::new()).await.unwrap_err();
        assert!(matches!(err, AttachmentError::NotFound(NotFoundKind::Entity(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found_not_empty() {
        let (service, app) = memory_service();
        let reference = service
            .upload(app, "resume", "cv.pdf", "application/pdf", chunked(b"abc", 1))
            .await
            .unwrap();

        service.storage().delete(reference.blob_id).await.unwrap();

        let err = service.download(app, reference.id).await.unwrap_err();
        assert!(matches!(
            err,
            AttachmentError::NotFound(NotFoundKind::Blob(id)) if id == reference.blob_id
        ));
    }

    #[tokio::test]
    async fn test_metadata_includes_blob_record() {
        let (service, app) = memory_service();
        let reference = service
            .upload(app, "offerLetter", "offer.doc", "application/msword", chunked(b"offer", 2))
            .await
            .unwrap();

        let metadata = service.metadata(app, reference.id).await.unwrap();
        assert_eq!(metadata.reference, reference);
        assert_eq!(metadata.blob.id, reference.blob_id);
        assert_eq!(metadata.blob.length, 5);
        assert_eq!(metadata.blob.media_type, "application/msword");
    }
}
