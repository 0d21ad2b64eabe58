//! PostgreSQL entity registry for application attachments.
//!
//! Reads go through `SeaORM`. Writes are single statements over the
//! `documents` JSONB array so concurrent appends never overwrite each other.

use applytrack_core::attachment::{DocumentReference, EntityRegistry, RegistryError};
use applytrack_shared::types::{ApplicationId, DocumentId};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, PaginatorTrait, Statement,
};
use tracing::debug;

use crate::entities::applications;

/// Appends one reference; zero affected rows means the application is unknown.
const APPEND_DOCUMENT_SQL: &str = r"
UPDATE applications
SET documents = documents || jsonb_build_array($2::jsonb)
WHERE id = $1
";

/// Filters one reference out of the array, preserving order, and returns it.
///
/// The containment check is re-evaluated against the locked row, so of two
/// concurrent removals of the same reference only one returns a row.
const REMOVE_DOCUMENT_SQL: &str = r"
WITH target AS (
    SELECT t.e AS document
    FROM applications a
    CROSS JOIN LATERAL jsonb_array_elements(a.documents) AS t(e)
    WHERE a.id = $1 AND t.e->>'id' = $2
    LIMIT 1
)
UPDATE applications
SET documents = COALESCE(
    (
        SELECT jsonb_agg(d.e ORDER BY d.ord)
        FROM jsonb_array_elements(applications.documents) WITH ORDINALITY AS d(e, ord)
        WHERE d.e->>'id' <> $2
    ),
    '[]'::jsonb
)
FROM target
WHERE applications.id = $1
  AND applications.documents @> jsonb_build_array(target.document)
RETURNING target.document
";

/// Entity registry backed by the `applications` table.
#[derive(Debug, Clone)]
pub struct ApplicationRegistry {
    db: DatabaseConnection,
}

impl ApplicationRegistry {
    /// Create a new application registry.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn exists(&self, application_id: ApplicationId) -> Result<bool, RegistryError> {
        let count = applications::Entity::find_by_id(application_id.into_inner())
            .count(&self.db)
            .await
            .map_err(|e| RegistryError::backend(e.to_string()))?;
        Ok(count > 0)
    }

    async fn load_documents(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<DocumentReference>, RegistryError> {
        let model = applications::Entity::find_by_id(application_id.into_inner())
            .one(&self.db)
            .await
            .map_err(|e| RegistryError::backend(e.to_string()))?
            .ok_or(RegistryError::EntityNotFound(application_id))?;

        decode(model.documents)
    }
}

impl EntityRegistry for ApplicationRegistry {
    async fn append_attachment(
        &self,
        application_id: ApplicationId,
        reference: DocumentReference,
    ) -> Result<(), RegistryError> {
        let document = serde_json::to_value(&reference)
            .map_err(|e| RegistryError::backend(format!("encode document reference: {e}")))?;

        let result = self
            .db
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                APPEND_DOCUMENT_SQL,
                [application_id.into_inner().into(), document.into()],
            ))
            .await
            .map_err(|e| RegistryError::backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::EntityNotFound(application_id));
        }

        debug!(%application_id, document_id = %reference.id, "document reference appended");
        Ok(())
    }

    async fn remove_attachment(
        &self,
        application_id: ApplicationId,
        document_id: DocumentId,
    ) -> Result<DocumentReference, RegistryError> {
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                REMOVE_DOCUMENT_SQL,
                [application_id.into_inner().into(), document_id.to_string().into()],
            ))
            .await
            .map_err(|e| RegistryError::backend(e.to_string()))?;

        let Some(row) = row else {
            return if self.exists(application_id).await? {
                Err(RegistryError::ReferenceNotFound(document_id))
            } else {
                Err(RegistryError::EntityNotFound(application_id))
            };
        };

        let document: serde_json::Value = row
            .try_get("", "document")
            .map_err(|e| RegistryError::backend(e.to_string()))?;
        let reference = serde_json::from_value(document)
            .map_err(|e| RegistryError::backend(format!("malformed document reference: {e}")))?;

        debug!(%application_id, %document_id, "document reference removed");
        Ok(reference)
    }

    async fn get_attachment(
        &self,
        application_id: ApplicationId,
        document_id: DocumentId,
    ) -> Result<DocumentReference, RegistryError> {
        self.load_documents(application_id)
            .await?
            .into_iter()
            .find(|r| r.id == document_id)
            .ok_or(RegistryError::ReferenceNotFound(document_id))
    }

    async fn list_attachments(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<DocumentReference>, RegistryError> {
        self.load_documents(application_id).await
    }
}

fn decode(documents: serde_json::Value) -> Result<Vec<DocumentReference>, RegistryError> {
    serde_json::from_value(documents)
        .map_err(|e| RegistryError::backend(format!("malformed documents column: {e}")))
}
