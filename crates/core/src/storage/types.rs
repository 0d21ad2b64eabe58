//! Blob store data types.

use applytrack_shared::types::BlobId;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// Stream of blob bytes handed back to readers.
pub type ByteStream = BoxStream<'static, Result<Bytes, StorageError>>;

/// A committed binary object. Never mutated after commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobRecord {
    /// Opaque identifier.
    pub id: BlobId,
    /// Length in bytes.
    pub length: u64,
    /// Media type declared when the write began.
    pub media_type: String,
    /// Commit timestamp.
    pub created_at: DateTime<Utc>,
}
