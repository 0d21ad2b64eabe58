//! Fixtures shared by the attachment pipeline tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use applytrack_shared::types::{ApplicationId, DocumentId};
use bytes::Bytes;
use futures::stream;

use super::registry::{EntityRegistry, MemoryRegistry, RegistryError};
use super::service::AttachmentService;
use super::types::DocumentReference;
use crate::storage::{StorageConfig, StorageProvider, StorageService};

pub(crate) type ChunkStream = stream::Iter<std::vec::IntoIter<Result<Bytes, std::io::Error>>>;

/// Split `data` into a caller byte stream of `size`-byte chunks.
pub(crate) fn chunked(data: &[u8], size: usize) -> ChunkStream {
    let chunks: Vec<_> = data
        .chunks(size.max(1))
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    stream::iter(chunks)
}

/// Service over an in-memory store and registry with one registered application.
pub(crate) fn memory_service() -> (AttachmentService<MemoryRegistry>, ApplicationId) {
    service_with(StorageConfig::new(StorageProvider::Memory))
}

pub(crate) fn service_with(
    config: StorageConfig,
) -> (AttachmentService<MemoryRegistry>, ApplicationId) {
    let storage = Arc::new(StorageService::from_config(config).unwrap());
    let registry = Arc::new(MemoryRegistry::new());
    let app = ApplicationId::new();
    registry.register(app);
    (AttachmentService::new(storage, registry), app)
}

/// Registry whose appends and removals can be made to fail.
#[derive(Debug, Default)]
pub(crate) struct FlakyRegistry {
    pub(crate) inner: MemoryRegistry,
    fail_appends: AtomicBool,
    fail_removes: AtomicBool,
}

impl FlakyRegistry {
    pub(crate) fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }
}

impl EntityRegistry for FlakyRegistry {
    async fn append_attachment(
        &self,
        application_id: ApplicationId,
        reference: DocumentReference,
    ) -> Result<(), RegistryError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(RegistryError::backend("append rejected"));
        }
        self.inner.append_attachment(application_id, reference).await
    }

    async fn remove_attachment(
        &self,
        application_id: ApplicationId,
        document_id: DocumentId,
    ) -> Result<DocumentReference, RegistryError> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(RegistryError::backend("remove rejected"));
        }
        self.inner.remove_attachment(application_id, document_id).await
    }

    async fn get_attachment(
        &self,
        application_id: ApplicationId,
        document_id: DocumentId,
    ) -> Result<DocumentReference, RegistryError> {
        self.inner.get_attachment(application_id, document_id).await
    }

    async fn list_attachments(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<DocumentReference>, RegistryError> {
        self.inner.list_attachments(application_id).await
    }
}

/// Registry that applies appends and then stalls before acknowledging them.
#[derive(Debug)]
pub(crate) struct SlowAckRegistry {
    pub(crate) inner: MemoryRegistry,
    pub(crate) ack_delay: Duration,
}

impl EntityRegistry for SlowAckRegistry {
    async fn append_attachment(
        &self,
        application_id: ApplicationId,
        reference: DocumentReference,
    ) -> Result<(), RegistryError> {
        self.inner.append_attachment(application_id, reference).await?;
        tokio::time::sleep(self.ack_delay).await;
        Ok(())
    }

    async fn remove_attachment(
        &self,
        application_id: ApplicationId,
        document_id: DocumentId,
    ) -> Result<DocumentReference, RegistryError> {
        self.inner.remove_attachment(application_id, document_id).await
    }

    async fn get_attachment(
        &self,
        application_id: ApplicationId,
        document_id: DocumentId,
    ) -> Result<DocumentReference, RegistryError> {
        self.inner.get_attachment(application_id, document_id).await
    }

    async fn list_attachments(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<DocumentReference>, RegistryError> {
        self.inner.list_attachments(application_id).await
    }
}
