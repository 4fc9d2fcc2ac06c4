//! resume-vault - per-user resume storage
//!
//! This crate stores resume files (PDF and Word, capped size) for
//! authenticated users:
//! - Blobs in a swappable object store (local filesystem, GCS)
//! - One metadata row per blob in an embedded redb table
//! - Uploads written blob-first, with the blob removed again if the row write fails
//! - In-process upload notifications for live listings
//! - REST API with multipart upload

pub mod api;
pub mod config;
pub mod events;
pub mod object_store;
pub mod storage;
#[cfg(test)]
pub mod testutil;
pub mod vault;

use std::sync::Arc;

use config::Config;
use events::UploadBus;
use object_store::ObjectStore;
use storage::MetadataTable;
use vault::{Lifecycle, Uploader};

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub bus: UploadBus,
    pub lifecycle: Lifecycle,
    pub uploader: Uploader,
}

impl AppState {
    /// Wire the vault components over one object store and one metadata table.
    pub fn new(
        config: Config,
        object_store: Arc<dyn ObjectStore>,
        table: Arc<dyn MetadataTable>,
    ) -> Self {
        let bus = UploadBus::new();
        let uploader = Uploader::new(
            Arc::clone(&object_store),
            Arc::clone(&table),
            bus.clone(),
            config.max_upload_size,
        );
        let lifecycle = Lifecycle::new(object_store, table);

        Self {
            config,
            bus,
            lifecycle,
            uploader,
        }
    }
}
