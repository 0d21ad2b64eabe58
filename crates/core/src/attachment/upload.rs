//! Upload orchestration: receive, commit, link, compensate.

use std::fmt::Display;
use std::pin::pin;
use std::sync::Arc;

use applytrack_shared::types::ApplicationId;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use super::error::AttachmentError;
use super::registry::EntityRegistry;
use super::service::AttachmentService;
use super::types::{DocumentCategory, DocumentReference, UploadPhase};
use super::validator::{self, ValidatedFile};
use crate::storage::BlobRecord;

/// A committed blob waiting for its category before it is linked.
///
/// Consume it with [`StagedUpload::link`] or [`StagedUpload::discard`]. If it
/// is dropped instead, the blob is deleted in the background.
pub struct StagedUpload<'a, R: EntityRegistry> {
    service: &'a AttachmentService<R>,
    application_id: ApplicationId,
    filename: String,
    blob: BlobRecord,
    state: LinkState,
}

/// Who is responsible for the committed blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    /// Not linked yet; dropping deletes the blob.
    Pending,
    /// Append in flight. The registry may have applied it, so the blob is kept.
    Linking,
    /// Linked or cleaned up.
    Settled,
}

impl<R: EntityRegistry> std::fmt::Debug for StagedUpload<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedUpload")
            .field("application_id", &self.application_id)
            .field("filename", &self.filename)
            .field("blob", &self.blob)
            .finish_non_exhaustive()
    }
}

impl<R: EntityRegistry> StagedUpload<'_, R> {
    /// The committed blob.
    #[must_use]
    pub fn blob(&self) -> &BlobRecord {
        &self.blob
    }

    /// Sanitized filename the reference will carry.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Owning application.
    #[must_use]
    pub fn application_id(&self) -> ApplicationId {
        self.application_id
    }

    /// Validate the category and link the blob to the application.
    ///
    /// On any failure the committed blob is deleted before the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `AttachmentError::Validation` for an unknown category,
    /// `AttachmentError::NotFound` if the application does not exist, or
    /// `AttachmentError::Registry` if the append fails.
    #[instrument(skip(self), fields(application_id = %self.application_id, blob_id = %self.blob.id))]
    pub async fn link(self, category: &str) -> Result<DocumentReference, AttachmentError> {
        debug!(phase = %UploadPhase::Validating, "checking category");
        match validator::validate_category(category) {
            Ok(category) => self.finish(category).await,
            Err(err) => {
                debug!(phase = %UploadPhase::Validating, error = %err, "category rejected");
                Err(self.fail(err.into()).await)
            }
        }
    }

    /// Delete the committed blob without linking it.
    ///
    /// # Errors
    ///
    /// Returns `AttachmentError::Storage` if the blob could not be deleted.
    #[instrument(skip(self), fields(application_id = %self.application_id, blob_id = %self.blob.id))]
    pub async fn discard(mut self) -> Result<(), AttachmentError> {
        let result = self.service.storage.delete(self.blob.id).await;
        self.state = LinkState::Settled;
        match result {
            Ok(()) => {
                debug!(blob_id = %self.blob.id, "staged upload discarded");
                Ok(())
            }
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub(super) async fn finish(
        mut self,
        category: DocumentCategory,
    ) -> Result<DocumentReference, AttachmentError> {
        let reference = DocumentReference::new(category, self.filename.clone(), self.blob.id);

        debug!(phase = %UploadPhase::Linking, document_id = %reference.id, "appending reference");
        self.state = LinkState::Linking;
        match self
            .service
            .registry
            .append_attachment(self.application_id, reference.clone())
            .await
        {
            Ok(()) => {
                self.state = LinkState::Settled;
                info!(
                    phase = %UploadPhase::Done,
                    application_id = %self.application_id,
                    document_id = %reference.id,
                    blob_id = %reference.blob_id,
                    category = %reference.category,
                    length = self.blob.length,
                    "attachment uploaded"
                );
                Ok(reference)
            }
            Err(err) => {
                self.state = LinkState::Pending;
                Err(self.fail(err.into()).await)
            }
        }
    }

    async fn fail(mut self, err: AttachmentError) -> AttachmentError {
        self.service
            .compensate(self.application_id, self.blob.id)
            .await;
        self.state = LinkState::Settled;
        debug!(phase = %UploadPhase::Failed, error = %err, "upload failed");
        err
    }
}

impl<R: EntityRegistry> Drop for StagedUpload<'_, R> {
    fn drop(&mut self) {
        let blob_id = self.blob.id;
        match self.state {
            LinkState::Settled => return,
            LinkState::Linking => {
                error!(%blob_id, "upload cancelled while linking, blob kept as possible orphan for sweep");
                return;
            }
            LinkState::Pending => {}
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(%blob_id, "staged upload dropped before linking, deleting blob in background");
                let storage = Arc::clone(&self.service.storage);
                runtime.spawn(async move {
                    if let Err(err) = storage.delete(blob_id).await {
                        if !err.is_not_found() {
                            error!(%blob_id, error = %err, "failed to delete unlinked blob, orphan left for sweep");
                        }
                    }
                });
            }
            Err(_) => {
                error!(%blob_id, "staged upload dropped outside a runtime, orphan left for sweep");
            }
        }
    }
}

impl<R: EntityRegistry> AttachmentService<R> {
    /// Upload an attachment and link it to an application.
    ///
    /// Every declared field is validated before the first byte is written.
    /// The size ceiling is enforced while bytes arrive, so an oversized
    /// stream never produces a committed blob. If linking fails the blob is
    /// deleted again and the original error is returned.
    ///
    /// # Errors
    ///
    /// - `Validation` for a bad category, filename or media type
    /// - `SizeLimitExceeded` if the stream passes the ceiling
    /// - `Interrupted` if the caller's stream fails
    /// - `NotFound` if the application does not exist
    /// - `Storage` / `Registry` if a collaborator fails
    #[instrument(skip(self, stream), fields(%application_id))]
    pub async fn upload<S, E>(
        &self,
        application_id: ApplicationId,
        category: &str,
        filename: &str,
        media_type: &str,
        stream: S,
    ) -> Result<DocumentReference, AttachmentError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Display,
    {
        debug!(phase = %UploadPhase::Validating, "checking declared fields");
        let validated = validator::validate(category, filename, media_type).inspect_err(|err| {
            debug!(phase = %UploadPhase::Failed, error = %err, "upload rejected");
        })?;

        let staged = self
            .receive_validated(application_id, validated.file, stream)
            .await?;
        staged.finish(validated.category).await
    }

    /// Stream bytes into a committed blob before the category is known.
    ///
    /// Filename and media type are validated before writing; the category is
    /// checked by [`StagedUpload::link`].
    ///
    /// # Errors
    ///
    /// Same as [`AttachmentService::upload`], minus linking failures.
    #[instrument(skip(self, stream), fields(%application_id))]
    pub async fn receive<S, E>(
        &self,
        application_id: ApplicationId,
        stream: S,
        filename: &str,
        media_type: &str,
    ) -> Result<StagedUpload<'_, R>, AttachmentError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Display,
    {
        let file = validator::validate_file(filename, media_type)?;
        self.receive_validated(application_id, file, stream).await
    }

    async fn receive_validated<S, E>(
        &self,
        application_id: ApplicationId,
        file: ValidatedFile,
        stream: S,
    ) -> Result<StagedUpload<'_, R>, AttachmentError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Display,
    {
        let limit = self.max_upload_bytes;
        let mut handle = self.storage.begin_write(file.kind.media_type()).await?;
        debug!(phase = %UploadPhase::Receiving, blob_id = %handle.blob_id(), "receiving bytes");

        let mut stream = pin!(stream);
        while let Some(item) = stream.next().await {
            let chunk = match item.map_err(|e| e.to_string()) {
                Ok(chunk) => chunk,
                Err(reason) => {
                    handle.abort().await;
                    debug!(phase = %UploadPhase::Failed, %reason, "caller stream failed");
                    return Err(AttachmentError::Interrupted(reason));
                }
            };

            if handle.written() + chunk.len() as u64 > limit {
                handle.abort().await;
                debug!(phase = %UploadPhase::Failed, limit, "size limit exceeded");
                return Err(AttachmentError::SizeLimitExceeded { limit });
            }

            if let Err(err) = handle.write(chunk).await {
                handle.abort().await;
                return Err(err.into());
            }
        }

        debug!(phase = %UploadPhase::Committing, written = handle.written(), "committing blob");
        let blob = self.storage.commit(handle).await?;

        Ok(StagedUpload {
            service: self,
            application_id,
            filename: file.filename,
            blob,
            state: LinkState::Pending,
        })
    }
}
