use std::sync::Arc;

use bytes::Bytes;

use super::error::VaultError;
use crate::object_store::ObjectStore;
use crate::storage::models::{RecordFilter, ResumeMime, ResumeRecord};
use crate::storage::MetadataTable;

/// Explicit user consent to delete a resume.
pub trait Confirm {
    fn confirm(&self, record: &ResumeRecord) -> bool;
}

impl Confirm for bool {
    fn confirm(&self, _record: &ResumeRecord) -> bool {
        *self
    }
}

impl<F> Confirm for F
where
    F: Fn(&ResumeRecord) -> bool,
{
    fn confirm(&self, record: &ResumeRecord) -> bool {
        self(record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Confirmation was declined; nothing was touched.
    Cancelled,
}

/// A fetched blob, tagged for saving under its original name.
#[derive(Debug, Clone)]
pub struct Download {
    pub display_name: String,
    pub mime_type: ResumeMime,
    pub data: Bytes,
}

/// Read and delete paths over both halves of a resume.
#[derive(Clone)]
pub struct Lifecycle {
    object_store: Arc<dyn ObjectStore>,
    table: Arc<dyn MetadataTable>,
}

impl Lifecycle {
    pub fn new(object_store: Arc<dyn ObjectStore>, table: Arc<dyn MetadataTable>) -> Self {
        Self {
            object_store,
            table,
        }
    }

    /// The owner's resumes, newest first. No resumes is an empty list.
    pub async fn list(&self, owner_id: &str) -> Result<Vec<ResumeRecord>, VaultError> {
        self.table
            .select(&RecordFilter::owner(owner_id))
            .await
            .map_err(|e| {
                tracing::warn!(owner_id, error = %e, "Failed to load resumes");
                VaultError::Network(e.to_string())
            })
    }

    /// One of the owner's resumes by id.
    pub async fn find(&self, owner_id: &str, id: &str) -> Result<ResumeRecord, VaultError> {
        self.table
            .select(&RecordFilter::record(owner_id, id))
            .await
            .map_err(|e| VaultError::Network(e.to_string()))?
            .into_iter()
            .next()
            .ok_or(VaultError::NotFound)
    }

    pub async fn download(&self, record: &ResumeRecord) -> Result<Download, VaultError> {
        let data = self
            .object_store
            .get(&record.storage_key)
            .await
            .map_err(|e| {
                tracing::warn!(
                    record_id = %record.id,
                    storage_key = %record.storage_key,
                    error = %e,
                    "Download failed"
                );
                VaultError::DownloadFailed(e)
            })?;

        tracing::debug!(record_id = %record.id, bytes = data.len(), "Downloaded resume");
        Ok(Download {
            display_name: record.display_name.clone(),
            mime_type: record.mime_type,
            data,
        })
    }

    /// Remove the blob, then the row. A failed blob removal leaves the row in
    /// place; a failed row removal after the blob is gone leaves a dangling row.
    pub async fn delete(
        &self,
        record: &ResumeRecord,
        confirm: impl Confirm,
    ) -> Result<DeleteOutcome, VaultError> {
        if !confirm.confirm(record) {
            tracing::debug!(record_id = %record.id, "Delete not confirmed");
            return Ok(DeleteOutcome::Cancelled);
        }

        self.object_store
            .delete(&[record.storage_key.clone()])
            .await
            .map_err(|e| {
                tracing::warn!(
                    record_id = %record.id,
                    storage_key = %record.storage_key,
                    error = %e,
                    "Failed to delete blob; keeping record"
                );
                VaultError::DeleteBlobFailed(e)
            })?;

        self.table
            .delete(&RecordFilter::record(&record.owner_id, &record.id))
            .await
            .map_err(|e| {
                tracing::error!(
                    record_id = %record.id,
                    storage_key = %record.storage_key,
                    error = %e,
                    "Blob deleted but record remains"
                );
                VaultError::DeleteRowFailed(e)
            })?;

        tracing::info!(
            owner_id = %record.owner_id,
            record_id = %record.id,
            "Deleted resume"
        );
        Ok(DeleteOutcome::Deleted)
    }
}
