use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::error::VaultError;
use super::keys::{storage_key, KeyClock};
use super::saga::{Saga, SagaStep};
use crate::events::{UploadBus, UploadEvent};
use crate::object_store::{ObjectStore, PutMode};
use crate::storage::models::{NewResume, ResumeMime, ResumeRecord};
use crate::storage::MetadataTable;

/// Upload size cap: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024;

/// A file offered for upload, as received from the user.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl CandidateFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Stores the blob, then writes its metadata row, undoing the blob if the row
/// cannot be written.
pub struct Uploader {
    bus: UploadBus,
    clock: KeyClock,
    max_size: u64,
    saga: Saga<UploadContext>,
}

struct UploadContext {
    key: String,
    data: Bytes,
    row: NewResume,
    record: Option<ResumeRecord>,
}

impl Uploader {
    /// `max_size` is capped at [`DEFAULT_MAX_UPLOAD_SIZE`].
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        table: Arc<dyn MetadataTable>,
        bus: UploadBus,
        max_size: u64,
    ) -> Self {
        let saga = Saga::new("upload")
            .step(StoreBlob {
                object_store: Arc::clone(&object_store),
            })
            .step(InsertRow { table });

        Self {
            bus,
            clock: KeyClock::new(),
            max_size: max_size.min(DEFAULT_MAX_UPLOAD_SIZE),
            saga,
        }
    }

    /// Check type and size. Nothing remote is touched.
    pub fn validate(&self, file: &CandidateFile) -> Result<ResumeMime, VaultError> {
        let mime_type = ResumeMime::parse(&file.mime_type)
            .ok_or_else(|| VaultError::InvalidType(file.mime_type.clone()))?;

        if file.size_bytes() > self.max_size {
            return Err(VaultError::TooLarge {
                size: file.size_bytes(),
                limit: self.max_size,
            });
        }

        Ok(mime_type)
    }

    pub async fn submit(
        &self,
        file: CandidateFile,
        owner_id: &str,
    ) -> Result<ResumeRecord, VaultError> {
        let mime_type = self.validate(&file)?;
        let size_bytes = file.size_bytes();
        let key = storage_key(owner_id, self.clock.next_millis(), &file.name);

        tracing::debug!(
            owner_id,
            storage_key = %key,
            size_bytes,
            mime_type = %mime_type,
            "Uploading resume"
        );

        let mut ctx = UploadContext {
            row: NewResume {
                owner_id: owner_id.to_string(),
                display_name: file.name,
                storage_key: key.clone(),
                size_bytes,
                mime_type,
            },
            key,
            data: file.data,
            record: None,
        };

        if let Err(failure) = self.saga.execute(&mut ctx).await {
            if failure.fully_unwound() {
                tracing::warn!(
                    owner_id,
                    storage_key = %ctx.key,
                    step = failure.failed_step,
                    error = %failure.error,
                    "Upload failed"
                );
            } else {
                tracing::error!(
                    owner_id,
                    storage_key = %ctx.key,
                    step = failure.failed_step,
                    error = %failure.error,
                    "Upload failed and its blob could not be removed"
                );
            }
            return Err(failure.error);
        }

        let record = ctx
            .record
            .take()
            .ok_or_else(|| VaultError::Network("metadata insert returned no row".to_string()))?;

        self.bus.emit(UploadEvent::Uploaded {
            owner_id: record.owner_id.clone(),
            record_id: record.id.clone(),
        });

        tracing::info!(
            owner_id,
            record_id = %record.id,
            storage_key = %record.storage_key,
            "Uploaded resume"
        );
        Ok(record)
    }
}

struct StoreBlob {
    object_store: Arc<dyn ObjectStore>,
}

#[async_trait]
impl SagaStep<UploadContext> for StoreBlob {
    fn name(&self) -> &'static str {
        "store-blob"
    }

    async fn run(&self, ctx: &mut UploadContext) -> Result<(), VaultError> {
        self.object_store
            .put(&ctx.key, ctx.data.clone(), PutMode::Create)
            .await
            .map_err(VaultError::StoreWriteFailed)
    }

    async fn compensate(&self, ctx: &mut UploadContext) -> Result<(), VaultError> {
        self.object_store
            .delete(&[ctx.key.clone()])
            .await
            .map_err(VaultError::DeleteBlobFailed)
    }
}

struct InsertRow {
    table: Arc<dyn MetadataTable>,
}

#[async_trait]
impl SagaStep<UploadContext> for InsertRow {
    fn name(&self) -> &'static str {
        "insert-row"
    }

    async fn run(&self, ctx: &mut UploadContext) -> Result<(), VaultError> {
        let record = self
            .table
            .insert(ctx.row.clone())
            .await
            .map_err(VaultError::MetadataWriteFailed)?;
        ctx.record = Some(record);
        Ok(())
    }
}
