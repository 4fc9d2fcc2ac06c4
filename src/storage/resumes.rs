use async_trait::async_trait;
use chrono::Utc;
use redb::{ReadableTable, WriteTransaction};

use super::db::{Database, DatabaseError};
use super::models::{NewResume, RecordFilter, ResumeRecord};
use super::tables::*;
use super::MetadataTable;

impl Database {
    // ========================================================================
    // Resume operations
    // ========================================================================

    /// Store a resume record and add it to its owner's index
    pub fn put_resume(&self, record: &ResumeRecord) -> Result<(), DatabaseError> {
        debug_assert!(!record.id.is_empty(), "resume id must not be empty");
        debug_assert!(!record.owner_id.is_empty(), "resume owner must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(RESUMES)?;
            let data = rmp_serde::to_vec_named(record)?;
            table.insert(record.id.as_str(), data.as_slice())?;
        }
        {
            let mut ids = owner_ids(&write_txn, &record.owner_id)?;
            if !ids.contains(&record.id) {
                ids.push(record.id.clone());
                write_owner_ids(&write_txn, &record.owner_id, &ids)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a resume by its UUID
    pub fn get_resume(&self, id: &str) -> Result<Option<ResumeRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(RESUMES)?;

        let record = match table.get(id)? {
            Some(data) => Some(rmp_serde::from_slice(data.value())?),
            None => None,
        };
        Ok(record)
    }

    /// All resumes belonging to an owner, newest first
    pub fn resumes_for_owner(&self, owner_id: &str) -> Result<Vec<ResumeRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let owner_table = read_txn.open_table(OWNER_RESUMES)?;
        let table = read_txn.open_table(RESUMES)?;

        let ids: Vec<String> = match owner_table.get(owner_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(data) = table.get(id.as_str())? {
                records.push(rmp_serde::from_slice::<ResumeRecord>(data.value())?);
            }
        }

        sort_newest_first(&mut records);
        Ok(records)
    }

    /// Resumes matching a filter, newest first
    pub fn select_resumes(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<ResumeRecord>, DatabaseError> {
        match filter.id {
            Some(ref id) => Ok(self
                .get_resume(id)?
                .filter(|r| filter.matches(r))
                .into_iter()
                .collect()),
            None => self.resumes_for_owner(&filter.owner_id),
        }
    }

    /// Delete every resume matching the filter. Returns how many rows were removed.
    pub fn delete_resumes(&self, filter: &RecordFilter) -> Result<u64, DatabaseError> {
        let write_txn = self.begin_write()?;

        let mut ids = owner_ids(&write_txn, &filter.owner_id)?;
        let doomed: Vec<String> = match filter.id {
            Some(ref id) => ids.iter().filter(|i| *i == id).cloned().collect(),
            None => ids.clone(),
        };

        {
            let mut table = write_txn.open_table(RESUMES)?;
            for id in &doomed {
                table.remove(id.as_str())?;
            }
        }

        ids.retain(|i| !doomed.contains(i));
        write_owner_ids(&write_txn, &filter.owner_id, &ids)?;

        write_txn.commit()?;
        Ok(doomed.len() as u64)
    }
}

fn owner_ids(write_txn: &WriteTransaction, owner_id: &str) -> Result<Vec<String>, DatabaseError> {
    let table = write_txn.open_table(OWNER_RESUMES)?;
    let ids = match table.get(owner_id)? {
        Some(data) => rmp_serde::from_slice(data.value())?,
        None => Vec::new(),
    };
    Ok(ids)
}

/// Rewrite an owner's index entry, dropping it once empty.
fn write_owner_ids(
    write_txn: &WriteTransaction,
    owner_id: &str,
    ids: &[String],
) -> Result<(), DatabaseError> {
    let mut table = write_txn.open_table(OWNER_RESUMES)?;
    if ids.is_empty() {
        table.remove(owner_id)?;
    } else {
        let data = rmp_serde::to_vec_named(ids)?;
        table.insert(owner_id, data.as_slice())?;
    }
    Ok(())
}

fn sort_newest_first(records: &mut [ResumeRecord]) {
    records.sort_by(|a, b| {
        b.uploaded_at
            .cmp(&a.uploaded_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[async_trait]
impl MetadataTable for Database {
    async fn insert(&self, row: NewResume) -> Result<ResumeRecord, DatabaseError> {
        let record = ResumeRecord {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: row.owner_id,
            display_name: row.display_name,
            storage_key: row.storage_key,
            size_bytes: row.size_bytes,
            mime_type: row.mime_type,
            uploaded_at: Utc::now(),
        };

        self.blocking(move |db| {
            db.put_resume(&record)?;
            Ok(record)
        })
        .await
    }

    async fn select(&self, filter: &RecordFilter) -> Result<Vec<ResumeRecord>, DatabaseError> {
        let filter = filter.clone();
        self.blocking(move |db| db.select_resumes(&filter)).await
    }

    async fn delete(&self, filter: &RecordFilter) -> Result<u64, DatabaseError> {
        let filter = filter.clone();
        self.blocking(move |db| db.delete_resumes(&filter)).await
    }
}
