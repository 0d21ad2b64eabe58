//! Entity registry collaborator.
//!
//! The registry owns application records and their embedded, ordered list of
//! document references. The attachment pipelines only ever touch that list
//! through this trait.

use std::future::Future;

use applytrack_shared::types::{ApplicationId, DocumentId};
use dashmap::DashMap;
use thiserror::Error;

use super::types::DocumentReference;

/// Registry operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The owning application does not exist.
    #[error("application not found: {0}")]
    EntityNotFound(ApplicationId),

    /// The application has no reference with this id.
    #[error("document not found: {0}")]
    ReferenceNotFound(DocumentId),

    /// The backing store failed.
    #[error("registry backend error: {0}")]
    Backend(String),
}

impl RegistryError {
    /// Create a backend error.
    #[must_use]
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Repository trait for the attachment list embedded in an application.
///
/// Implemented by the db crate for PostgreSQL and by [`MemoryRegistry`].
pub trait EntityRegistry: Send + Sync {
    /// Append one reference to the application's list.
    ///
    /// Must be an atomic append: concurrent calls for the same application
    /// never lose one another's reference.
    fn append_attachment(
        &self,
        application_id: ApplicationId,
        reference: DocumentReference,
    ) -> impl Future<Output = Result<(), RegistryError>> + Send;

    /// Remove one reference, returning it.
    fn remove_attachment(
        &self,
        application_id: ApplicationId,
        document_id: DocumentId,
    ) -> impl Future<Output = Result<DocumentReference, RegistryError>> + Send;

    /// Look up one reference.
    fn get_attachment(
        &self,
        application_id: ApplicationId,
        document_id: DocumentId,
    ) -> impl Future<Output = Result<DocumentReference, RegistryError>> + Send;

    /// All references of an application, in insertion order.
    fn list_attachments(
        &self,
        application_id: ApplicationId,
    ) -> impl Future<Output = Result<Vec<DocumentReference>, RegistryError>> + Send;
}

/// In-process registry backed by a concurrent map.
///
/// Each application's list is mutated under its map entry lock, so appends
/// to the same application serialize and none are lost.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    entities: DashMap<ApplicationId, Vec<DocumentReference>>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an application with an empty attachment list.
    pub fn register(&self, application_id: ApplicationId) {
        self.entities.entry(application_id).or_default();
    }

    /// Drop an application record, returning its references.
    ///
    /// Callers should purge the application's attachments first.
    pub fn forget(&self, application_id: ApplicationId) -> Option<Vec<DocumentReference>> {
        self.entities.remove(&application_id).map(|(_, refs)| refs)
    }

    /// Returns true if the application is registered.
    #[must_use]
    pub fn contains(&self, application_id: ApplicationId) -> bool {
        self.entities.contains_key(&application_id)
    }
}

impl EntityRegistry for MemoryRegistry {
    async fn append_attachment(
        &self,
        application_id: ApplicationId,
        reference: DocumentReference,
    ) -> Result<(), RegistryError> {
        let mut refs = self
            .entities
            .get_mut(&application_id)
            .ok_or(RegistryError::EntityNotFound(application_id))?;
        refs.push(reference);
        Ok(())
    }

    async fn remove_attachment(
        &self,
        application_id: ApplicationId,
        document_id: DocumentId,
    ) -> Result<DocumentReference, RegistryError> {
        let mut refs = self
            .entities
            .get_mut(&application_id)
            .ok_or(RegistryError::EntityNotFound(application_id))?;
        let index = refs
            .iter()
            .position(|r| r.id == document_id)
            .ok_or(RegistryError::ReferenceNotFound(document_id))?;
        Ok(refs.remove(index))
    }

    async fn get_attachment(
        &self,
        application_id: ApplicationId,
        document_id: DocumentId,
    ) -> Result<DocumentReference, RegistryError> {
        let refs = self
            .entities
            .get(&application_id)
            .ok_or(RegistryError::EntityNotFound(application_id))?;
        refs.iter()
            .find(|r| r.id == document_id)
            .cloned()
            .ok_or(RegistryError::ReferenceNotFound(document_id))
    }

    async fn list_attachments(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<DocumentReference>, RegistryError> {
        self.entities
            .get(&application_id)
            .map(|refs| refs.value().clone())
            .ok_or(RegistryError::EntityNotFound(application_id))
    }
}
