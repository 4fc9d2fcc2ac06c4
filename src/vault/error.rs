use thiserror::Error;

use crate::object_store::ObjectStoreError;
use crate::storage::DatabaseError;

/// Every way a vault operation can fail.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Only PDF and Word documents are allowed (got {0:?})")]
    InvalidType(String),
    #[error("File is {size} bytes; the limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
    #[error("Upload failed: {0}")]
    StoreWriteFailed(#[source] ObjectStoreError),
    #[error("Database error: {0}")]
    MetadataWriteFailed(#[source] DatabaseError),
    #[error("Failed to download: {0}")]
    DownloadFailed(#[source] ObjectStoreError),
    #[error("Failed to delete stored file: {0}")]
    DeleteBlobFailed(#[source] ObjectStoreError),
    #[error("Failed to delete resume record: {0}")]
    DeleteRowFailed(#[source] DatabaseError),
    #[error("Resume not found")]
    NotFound,
    #[error("Network error: {0}")]
    Network(String),
}
