pub mod db;
pub mod models;
mod resumes;
mod tables;

pub use db::{Database, DatabaseError};
pub use tables::*;

use async_trait::async_trait;

use models::{NewResume, RecordFilter, ResumeRecord};

/// The metadata half of the vault: one row per stored blob.
#[async_trait]
pub trait MetadataTable: Send + Sync {
    /// Insert a row, assigning its id and upload timestamp.
    async fn insert(&self, row: NewResume) -> Result<ResumeRecord, DatabaseError>;
    /// Rows matching the filter, newest first.
    async fn select(&self, filter: &RecordFilter) -> Result<Vec<ResumeRecord>, DatabaseError>;
    /// Remove rows matching the filter, returning how many were removed.
    async fn delete(&self, filter: &RecordFilter) -> Result<u64, DatabaseError>;
}
