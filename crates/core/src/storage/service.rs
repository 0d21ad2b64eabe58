//! Storage service implementation using Apache OpenDAL.

use applytrack_shared::types::BlobId;
use bytes::Bytes;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use opendal::{ErrorKind, Operator, Writer, services};
use tracing::{debug, info, warn};

use super::config::{StorageConfig, StorageProvider};
use super::error::StorageError;
use super::types::{BlobRecord, ByteStream};

const BLOB_PREFIX: &str = "blobs/";
const DATA_SUFFIX: &str = ".bin";
const RECORD_SUFFIX: &str = ".json";

fn data_path(blob_id: BlobId) -> String {
    format!("{BLOB_PREFIX}{blob_id}{DATA_SUFFIX}")
}

fn record_path(blob_id: BlobId) -> String {
    format!("{BLOB_PREFIX}{blob_id}{RECORD_SUFFIX}")
}

/// Extract the blob id from a file name under `blobs/`.
fn parse_blob_name(name: &str) -> Option<BlobId> {
    let stem = name
        .strip_suffix(DATA_SUFFIX)
        .or_else(|| name.strip_suffix(RECORD_SUFFIX))?;
    stem.parse().ok()
}

/// Sink for one in-progress blob.
///
/// Bytes are forwarded to the backend as they are written; nothing is
/// buffered beyond the configured chunk. A handle that is dropped without
/// being committed or aborted schedules its own abort on the current Tokio
/// runtime, so a cancelled upload never produces a committed blob.
pub struct WriteHandle {
    blob_id: BlobId,
    media_type: String,
    written: u64,
    writer: Option<Writer>,
    operator: Operator,
}

impl WriteHandle {
    /// Identifier allocated for this blob.
    #[must_use]
    pub fn blob_id(&self) -> BlobId {
        self.blob_id
    }

    /// Media type the blob will be recorded with.
    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Bytes accepted so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append a chunk to the blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is closed or the backend rejects the write.
    pub async fn write(&mut self, chunk: Bytes) -> Result<(), StorageError> {
        let blob_id = self.blob_id;
        let writer = self
            .writer
            .as_mut()
            .ok_or(StorageError::HandleClosed(blob_id))?;
        let len = chunk.len() as u64;

        writer
            .write(chunk)
            .await
            .map_err(|e| StorageError::from_opendal(&e, blob_id))?;

        self.written += len;
        Ok(())
    }

    /// Discard the partially written blob. Never fails; problems are logged.
    pub async fn abort(mut self) {
        let Some(mut writer) = self.writer.take() else {
            return;
        };

        if let Err(err) = writer.abort().await {
            debug!(blob_id = %self.blob_id, error = %err, "backend writer abort failed");
        }
        remove_quietly(&self.operator, self.blob_id, &data_path(self.blob_id)).await;
        debug!(blob_id = %self.blob_id, written = self.written, "blob write aborted");
    }
}

impl Drop for WriteHandle {
    fn drop(&mut self) {
        let Some(mut writer) = self.writer.take() else {
            return;
        };
        let blob_id = self.blob_id;

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(%blob_id, "write handle dropped before commit, aborting in background");
                let operator = self.operator.clone();
                runtime.spawn(async move {
                    let _ = writer.abort().await;
                    remove_quietly(&operator, blob_id, &data_path(blob_id)).await;
                });
            }
            Err(_) => {
                warn!(%blob_id, "write handle dropped outside a runtime, partial data left for sweep");
            }
        }
    }
}

async fn remove_quietly(operator: &Operator, blob_id: BlobId, path: &str) {
    if let Err(err) = operator.delete(path).await {
        warn!(%blob_id, path, error = %err, "failed to remove blob object, left for sweep");
    }
}

/// Blob store for attachment content.
///
/// Built once at process start and shared by reference; there is no global
/// handle to the backend.
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        info!(
            provider = config.provider.name(),
            bucket = config.provider.bucket(),
            max_file_size = config.max_file_size,
            "Blob store initialized"
        );
        Ok(Self { operator, config })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            StorageProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            StorageProvider::Memory => Operator::new(services::Memory::default())
                .map_err(|e| StorageError::configuration(e.to_string()))?
                .finish(),
        };

        Ok(operator)
    }

    /// Allocate a new blob id and open a streaming sink for it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the backend cannot open a writer.
    pub async fn begin_write(&self, media_type: &str) -> Result<WriteHandle, StorageError> {
        let blob_id = BlobId::new();
        let writer = self
            .operator
            .writer_with(&data_path(blob_id))
            .chunk(self.config.chunk_size)
            .await
            .map_err(|e| StorageError::from_opendal(&e, blob_id))?;

        debug!(%blob_id, media_type, "blob write started");

        Ok(WriteHandle {
            blob_id,
            media_type: media_type.to_string(),
            written: 0,
            writer: Some(writer),
            operator: self.operator.clone(),
        })
    }

    /// Finalize a blob and record its length.
    ///
    /// The record is written after the data is flushed; until then the blob
    /// is invisible to `stat`, `open_read` and `exists`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the medium fails; the partial
    /// data is removed before returning.
    pub async fn commit(&self, mut handle: WriteHandle) -> Result<BlobRecord, StorageError> {
        let blob_id = handle.blob_id;
        let mut writer = handle
            .writer
            .take()
            .ok_or(StorageError::HandleClosed(blob_id))?;

        if let Err(err) = writer.close().await {
            remove_quietly(&self.operator, blob_id, &data_path(blob_id)).await;
            return Err(StorageError::from_opendal(&err, blob_id));
        }

        let record = BlobRecord {
            id: blob_id,
            length: handle.written,
            media_type: std::mem::take(&mut handle.media_type),
            created_at: Utc::now(),
        };
        let encoded = serde_json::to_vec(&record)
            .map_err(|e| StorageError::Corrupted(format!("encode record for {blob_id}: {e}")))?;

        if let Err(err) = self.operator.write(&record_path(blob_id), encoded).await {
            remove_quietly(&self.operator, blob_id, &data_path(blob_id)).await;
            return Err(StorageError::from_opendal(&err, blob_id));
        }

        debug!(%blob_id, length = record.length, "blob committed");
        Ok(record)
    }

    /// Read the committed record of a blob.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the blob is unknown or uncommitted.
    pub async fn stat(&self, blob_id: BlobId) -> Result<BlobRecord, StorageError> {
        let buffer = self
            .operator
            .read(&record_path(blob_id))
            .await
            .map_err(|e| StorageError::from_opendal(&e, blob_id))?;

        serde_json::from_slice(&buffer.to_vec())
            .map_err(|e| StorageError::Corrupted(format!("record for {blob_id}: {e}")))
    }

    /// Open a blob for streaming, returning its record alongside the bytes.
    ///
    /// The stream yields chunks of the configured size and fails with
    /// `StorageError::Corrupted` if the data ends before the recorded length.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the blob is unknown.
    pub async fn open(&self, blob_id: BlobId) -> Result<(BlobRecord, ByteStream), StorageError> {
        let record = self.stat(blob_id).await?;
        let reader = self
            .operator
            .reader(&data_path(blob_id))
            .await
            .map_err(|e| StorageError::from_opendal(&e, blob_id))?;

        let chunk = self.config.chunk_size as u64;
        let length = record.length;

        let stream = stream::try_unfold((reader, 0u64), move |(reader, offset)| async move {
            if offset >= length {
                return Ok(None);
            }

            let end = offset.saturating_add(chunk).min(length);
            let buffer = reader
                .read(offset..end)
                .await
                .map_err(|e| StorageError::from_opendal(&e, blob_id))?;

            if buffer.is_empty() {
                return Err(StorageError::Corrupted(format!(
                    "blob {blob_id} ended at byte {offset} of {length}"
                )));
            }

            let next = offset + buffer.len() as u64;
            Ok(Some((buffer.to_bytes(), (reader, next))))
        })
        .boxed();

        Ok((record, stream))
    }

    /// Open a blob for streaming.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the blob is unknown.
    pub async fn open_read(&self, blob_id: BlobId) -> Result<ByteStream, StorageError> {
        let (_, stream) = self.open(blob_id).await?;
        Ok(stream)
    }

    /// Read a whole blob into memory.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the blob is unknown.
    pub async fn read_to_end(&self, blob_id: BlobId) -> Result<Vec<u8>, StorageError> {
        let (record, mut stream) = self.open(blob_id).await?;
        let mut data = Vec::with_capacity(usize::try_from(record.length).unwrap_or(0));
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }
        Ok(data)
    }

    /// Delete a committed blob.
    ///
    /// The record goes first so readers stop seeing the blob before its data
    /// disappears. Data that cannot be removed is logged and left for the sweep.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the blob is already absent.
    pub async fn delete(&self, blob_id: BlobId) -> Result<(), StorageError> {
        self.operator
            .stat(&record_path(blob_id))
            .await
            .map_err(|e| StorageError::from_opendal(&e, blob_id))?;

        self.operator
            .delete(&record_path(blob_id))
            .await
            .map_err(|e| StorageError::from_opendal(&e, blob_id))?;

        remove_quietly(&self.operator, blob_id, &data_path(blob_id)).await;
        debug!(%blob_id, "blob deleted");
        Ok(())
    }

    /// Check whether a committed blob exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    pub async fn exists(&self, blob_id: BlobId) -> Result<bool, StorageError> {
        match self.operator.stat(&record_path(blob_id)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::from_opendal(&e, blob_id)),
        }
    }

    /// List every blob id with any object present, committed or not.
    ///
    /// Used by the orphan sweep; ids are sorted and unique.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be listed.
    pub async fn list_blob_ids(&self) -> Result<Vec<BlobId>, StorageError> {
        let entries = match self.operator.list(BLOB_PREFIX).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids: Vec<BlobId> = entries
            .iter()
            .filter_map(|entry| parse_blob_name(entry.name()))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Maximum attachment size in bytes.
    #[must_use]
    pub fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}
