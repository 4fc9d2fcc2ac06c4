use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use resume_vault::events::{Notice, UploadBus, UploadEvent};
use resume_vault::object_store::{LocalStore, ObjectStore, ObjectStoreError, PutMode};
use resume_vault::storage::models::{NewResume, RecordFilter, ResumeMime, ResumeRecord};
use resume_vault::storage::{Database, DatabaseError, MetadataTable};
use resume_vault::vault::{
    CandidateFile, DeleteOutcome, Lifecycle, ResumeListView, Uploader, VaultError,
    DEFAULT_MAX_UPLOAD_SIZE,
};

const MIB: usize = 1024 * 1024;
const PDF: &str = "application/pdf";

// ============================================================================
// Fault injection
// ============================================================================

/// Object store wrapper whose writes and deletes can be switched off.
struct FlakyStore {
    inner: LocalStore,
    fail_put: AtomicBool,
    fail_delete: AtomicBool,
}

#[async_trait]
impl ObjectStore for FlakyStore {
    async fn put(&self, key: &str, data: Bytes, mode: PutMode) -> Result<(), ObjectStoreError> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend("injected put failure".into()));
        }
        self.inner.put(key, data, mode).await
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        self.inner.get(key).await
    }

    async fn delete(&self, keys: &[String]) -> Result<(), ObjectStoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend("injected delete failure".into()));
        }
        self.inner.delete(keys).await
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        self.inner.exists(key).await
    }
}

/// Metadata table wrapper whose inserts and deletes can be switched off.
struct FlakyTable {
    inner: Database,
    fail_insert: AtomicBool,
    fail_delete: AtomicBool,
}

fn injected() -> DatabaseError {
    DatabaseError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "injected table failure",
    ))
}

#[async_trait]
impl MetadataTable for FlakyTable {
    async fn insert(&self, row: NewResume) -> Result<ResumeRecord, DatabaseError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.insert(row).await
    }

    async fn select(&self, filter: &RecordFilter) -> Result<Vec<ResumeRecord>, DatabaseError> {
        self.inner.select(filter).await
    }

    async fn delete(&self, filter: &RecordFilter) -> Result<u64, DatabaseError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.delete(filter).await
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    store: Arc<FlakyStore>,
    table: Arc<FlakyTable>,
    bus: UploadBus,
    uploader: Uploader,
    lifecycle: Lifecycle,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FlakyStore {
        inner: LocalStore::new(dir.path().join("files")).unwrap(),
        fail_put: AtomicBool::new(false),
        fail_delete: AtomicBool::new(false),
    });
    let table = Arc::new(FlakyTable {
        inner: Database::open(dir.path().join("data")).unwrap(),
        fail_insert: AtomicBool::new(false),
        fail_delete: AtomicBool::new(false),
    });
    let bus = UploadBus::new();

    let object_store: Arc<dyn ObjectStore> = store.clone();
    let metadata: Arc<dyn MetadataTable> = table.clone();
    let uploader = Uploader::new(
        Arc::clone(&object_store),
        Arc::clone(&metadata),
        bus.clone(),
        DEFAULT_MAX_UPLOAD_SIZE,
    );
    let lifecycle = Lifecycle::new(object_store, metadata);

    Harness {
        _dir: dir,
        store,
        table,
        bus,
        uploader,
        lifecycle,
    }
}

fn pdf(name: &str, size: usize) -> CandidateFile {
    CandidateFile::new(name, PDF, vec![b'%'; size])
}

/// Every blob currently in the store, found by walking the files dir.
fn blob_count(h: &Harness) -> usize {
    fn walk(path: &std::path::Path) -> usize {
        match std::fs::read_dir(path) {
            Ok(entries) => entries
                .flatten()
                .map(|e| {
                    let p = e.path();
                    if p.is_dir() {
                        walk(&p)
                    } else {
                        1
                    }
                })
                .sum(),
            Err(_) => 0,
        }
    }
    walk(&h._dir.path().join("files"))
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_then_list_shows_one_matching_record() {
    let h = harness();

    let record = h.uploader.submit(pdf("cv.pdf", 2 * MIB), "u1").await.unwrap();

    let listed = h.lifecycle.list("u1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], record);
    assert_eq!(listed[0].display_name, "cv.pdf");
    assert_eq!(listed[0].size_bytes, 2_097_152);
    assert_eq!(listed[0].mime_type, ResumeMime::Pdf);
    assert!(listed[0].storage_key.starts_with("u1/"));
    assert!(listed[0].storage_key.ends_with(".pdf"));
    assert!(h.store.exists(&record.storage_key).await.unwrap());
}

#[tokio::test]
async fn test_word_documents_are_accepted() {
    let h = harness();

    let doc = CandidateFile::new("cv.doc", "application/msword", vec![1u8; 10]);
    let docx = CandidateFile::new(
        "cv.docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        vec![2u8; 10],
    );

    assert_eq!(h.uploader.submit(doc, "u1").await.unwrap().mime_type, ResumeMime::Doc);
    assert_eq!(h.uploader.submit(docx, "u1").await.unwrap().mime_type, ResumeMime::Docx);
    assert_eq!(h.lifecycle.list("u1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_disallowed_type_is_rejected_before_any_write() {
    let h = harness();
    h.uploader.submit(pdf("cv.pdf", 10), "u1").await.unwrap();

    let exe = CandidateFile::new("cv.exe", "application/x-msdownload", vec![0u8; 10]);
    let err = h.uploader.submit(exe, "u1").await.unwrap_err();

    assert!(matches!(err, VaultError::InvalidType(ref t) if t == "application/x-msdownload"));
    assert_eq!(h.lifecycle.list("u1").await.unwrap().len(), 1);
    assert_eq!(blob_count(&h), 1);
}

#[tokio::test]
async fn test_oversize_file_is_rejected_before_any_write() {
    let h = harness();

    let err = h
        .uploader
        .submit(pdf("big.pdf", 10 * MIB + 1), "u1")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        VaultError::TooLarge { size, limit }
            if size == 10 * 1024 * 1024 + 1 && limit == DEFAULT_MAX_UPLOAD_SIZE
    ));
    assert!(h.lifecycle.list("u1").await.unwrap().is_empty());
    assert_eq!(blob_count(&h), 0);
}

#[tokio::test]
async fn test_file_exactly_at_the_limit_is_accepted() {
    let h = harness();
    let record = h
        .uploader
        .submit(pdf("edge.pdf", 10 * MIB), "u1")
        .await
        .unwrap();
    assert_eq!(record.size_bytes, DEFAULT_MAX_UPLOAD_SIZE);
}

#[tokio::test]
async fn test_uploader_limit_is_capped_at_ten_mib() {
    let h = harness();
    let object_store: Arc<dyn ObjectStore> = h.store.clone();
    let metadata: Arc<dyn MetadataTable> = h.table.clone();
    let uploader = Uploader::new(object_store, metadata, h.bus.clone(), 20 * MIB as u64);

    let err = uploader
        .submit(pdf("big.pdf", 11 * MIB), "u1")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        VaultError::TooLarge { limit, .. } if limit == DEFAULT_MAX_UPLOAD_SIZE
    ));
    assert_eq!(blob_count(&h), 0);
}

#[tokio::test]
async fn test_failed_metadata_insert_removes_the_blob() {
    let h = harness();
    h.table.fail_insert.store(true, Ordering::SeqCst);

    let err = h.uploader.submit(pdf("cv.pdf", 100), "u1").await.unwrap_err();

    assert!(matches!(err, VaultError::MetadataWriteFailed(_)));
    assert_eq!(blob_count(&h), 0);
    assert!(h.lifecycle.list("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_compensation_still_reports_the_metadata_error() {
    let h = harness();
    h.table.fail_insert.store(true, Ordering::SeqCst);
    h.store.fail_delete.store(true, Ordering::SeqCst);

    let err = h.uploader.submit(pdf("cv.pdf", 100), "u1").await.unwrap_err();

    assert!(matches!(err, VaultError::MetadataWriteFailed(_)));
    // The orphaned blob is left behind
    assert_eq!(blob_count(&h), 1);
    assert!(h.lifecycle.list("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_blob_write_touches_nothing_else() {
    let h = harness();
    h.store.fail_put.store(true, Ordering::SeqCst);
    let mut sub = h.bus.subscribe();

    let err = h.uploader.submit(pdf("cv.pdf", 100), "u1").await.unwrap_err();

    assert!(matches!(err, VaultError::StoreWriteFailed(_)));
    assert!(h.lifecycle.list("u1").await.unwrap().is_empty());
    let quiet = tokio::time::timeout(Duration::from_millis(50), sub.recv()).await;
    assert!(quiet.is_err(), "no upload event should fire");
}

#[tokio::test]
async fn test_concurrent_uploads_get_distinct_keys() {
    let h = harness();

    let (a, b) = tokio::join!(
        h.uploader.submit(pdf("a.pdf", 10), "u1"),
        h.uploader.submit(pdf("b.pdf", 10), "u1"),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.storage_key, b.storage_key);
    assert_eq!(h.lifecycle.list("u1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_name_without_extension_is_accepted() {
    let h = harness();
    let record = h.uploader.submit(pdf("resume", 10), "u1").await.unwrap();
    assert!(record.storage_key.ends_with('.'));
    assert_eq!(record.display_name, "resume");
}

#[tokio::test]
async fn test_successful_upload_emits_event() {
    let h = harness();
    let mut sub = h.bus.subscribe();

    let record = h.uploader.submit(pdf("cv.pdf", 10), "u1").await.unwrap();

    assert_eq!(
        sub.recv().await,
        Some(Notice::Event(UploadEvent::Uploaded {
            owner_id: "u1".to_string(),
            record_id: record.id,
        }))
    );
}

// ============================================================================
// List / download / delete
// ============================================================================

#[tokio::test]
async fn test_list_is_empty_for_new_owner() {
    let h = harness();
    assert!(h.lifecycle.list("nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_is_newest_first_and_owner_scoped() {
    let h = harness();
    let first = h.uploader.submit(pdf("first.pdf", 10), "u1").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = h.uploader.submit(pdf("second.pdf", 10), "u1").await.unwrap();
    h.uploader.submit(pdf("other.pdf", 10), "u2").await.unwrap();

    let ids: Vec<String> = h
        .lifecycle
        .list("u1")
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn test_download_returns_bytes_and_original_name() {
    let h = harness();
    let file = CandidateFile::new("Jane Doe CV.pdf", PDF, Bytes::from_static(b"%PDF-1.7 body"));
    let record = h.uploader.submit(file, "u1").await.unwrap();

    let download = h.lifecycle.download(&record).await.unwrap();

    assert_eq!(download.display_name, "Jane Doe CV.pdf");
    assert_eq!(download.mime_type, ResumeMime::Pdf);
    assert_eq!(download.data, Bytes::from_static(b"%PDF-1.7 body"));
    assert_eq!(h.lifecycle.list("u1").await.unwrap(), vec![record]);
}

#[tokio::test]
async fn test_download_of_missing_blob_fails() {
    let h = harness();
    let record = h.uploader.submit(pdf("cv.pdf", 10), "u1").await.unwrap();
    h.store.inner.delete(&[record.storage_key.clone()]).await.unwrap();

    let err = h.lifecycle.download(&record).await.unwrap_err();
    assert!(matches!(
        err,
        VaultError::DownloadFailed(ObjectStoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_confirmed_delete_removes_blob_and_row() {
    let h = harness();
    let record = h.uploader.submit(pdf("cv.pdf", 2 * MIB), "u1").await.unwrap();

    let outcome = h.lifecycle.delete(&record, true).await.unwrap();

    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(h.lifecycle.list("u1").await.unwrap().is_empty());
    assert!(matches!(
        h.store.get(&record.storage_key).await,
        Err(ObjectStoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_declined_delete_touches_nothing() {
    let h = harness();
    let record = h.uploader.submit(pdf("cv.pdf", 10), "u1").await.unwrap();

    let outcome = h
        .lifecycle
        .delete(&record, |r: &ResumeRecord| r.display_name != "cv.pdf")
        .await
        .unwrap();

    assert_eq!(outcome, DeleteOutcome::Cancelled);
    assert_eq!(h.lifecycle.list("u1").await.unwrap().len(), 1);
    assert!(h.store.exists(&record.storage_key).await.unwrap());
}

#[tokio::test]
async fn test_failed_blob_delete_keeps_the_row() {
    let h = harness();
    let record = h.uploader.submit(pdf("cv.pdf", 10), "u1").await.unwrap();
    h.store.fail_delete.store(true, Ordering::SeqCst);

    let err = h.lifecycle.delete(&record, true).await.unwrap_err();

    assert!(matches!(err, VaultError::DeleteBlobFailed(_)));
    assert_eq!(h.lifecycle.list("u1").await.unwrap(), vec![record.clone()]);
    assert!(h.store.exists(&record.storage_key).await.unwrap());
}

#[tokio::test]
async fn test_failed_row_delete_leaves_dangling_row() {
    let h = harness();
    let record = h.uploader.submit(pdf("cv.pdf", 10), "u1").await.unwrap();
    h.table.fail_delete.store(true, Ordering::SeqCst);

    let err = h.lifecycle.delete(&record, true).await.unwrap_err();

    assert!(matches!(err, VaultError::DeleteRowFailed(_)));
    assert_eq!(h.lifecycle.list("u1").await.unwrap().len(), 1);
    assert!(!h.store.exists(&record.storage_key).await.unwrap());
}

#[tokio::test]
async fn test_find_is_owner_scoped() {
    let h = harness();
    let record = h.uploader.submit(pdf("cv.pdf", 10), "u1").await.unwrap();

    assert_eq!(h.lifecycle.find("u1", &record.id).await.unwrap(), record);
    assert!(matches!(
        h.lifecycle.find("u2", &record.id).await,
        Err(VaultError::NotFound)
    ));
}

#[tokio::test]
async fn test_upload_list_delete_scenario() {
    let h = harness();

    h.uploader.submit(pdf("cv.pdf", 2 * MIB), "u1").await.unwrap();
    let listed = h.lifecycle.list("u1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].display_name, "cv.pdf");
    assert_eq!(listed[0].size_bytes, 2_097_152);

    let exe = CandidateFile::new("cv.exe", "application/x-msdownload", vec![0u8; 16]);
    assert!(matches!(
        h.uploader.submit(exe, "u1").await,
        Err(VaultError::InvalidType(_))
    ));
    assert_eq!(h.lifecycle.list("u1").await.unwrap(), listed);

    h.lifecycle.delete(&listed[0], true).await.unwrap();
    assert!(h.lifecycle.list("u1").await.unwrap().is_empty());
}

// ============================================================================
// List view
// ============================================================================

#[tokio::test]
async fn test_view_loads_on_activate_and_refreshes_on_upload() {
    let h = harness();
    h.uploader.submit(pdf("old.pdf", 10), "u1").await.unwrap();

    let mut view = ResumeListView::activate(h.lifecycle.clone(), &h.bus, "u1")
        .await
        .unwrap();
    assert_eq!(view.records().len(), 1);

    let uploaded = h.uploader.submit(pdf("new.pdf", 10), "u1").await.unwrap();
    let refreshed = view.next_upload().await.unwrap().unwrap();

    assert_eq!(refreshed.len(), 2);
    assert_eq!(refreshed[0].id, uploaded.id);
}

#[tokio::test]
async fn test_view_ignores_other_owners_uploads() {
    let h = harness();
    let mut view = ResumeListView::activate(h.lifecycle.clone(), &h.bus, "u1")
        .await
        .unwrap();

    h.uploader.submit(pdf("theirs.pdf", 10), "u2").await.unwrap();
    let waited = tokio::time::timeout(Duration::from_millis(50), view.next_upload()).await;

    assert!(waited.is_err());
    assert!(view.records().is_empty());
}

#[tokio::test]
async fn test_view_delete_drops_record_from_list() {
    let h = harness();
    let keep = h.uploader.submit(pdf("keep.pdf", 10), "u1").await.unwrap();
    let gone = h.uploader.submit(pdf("gone.pdf", 10), "u1").await.unwrap();

    let mut view = ResumeListView::activate(h.lifecycle.clone(), &h.bus, "u1")
        .await
        .unwrap();
    assert_eq!(view.records().len(), 2);

    assert_eq!(view.delete(&gone, true).await.unwrap(), DeleteOutcome::Deleted);
    assert_eq!(view.records(), &[keep.clone()][..]);

    assert_eq!(view.delete(&keep, false).await.unwrap(), DeleteOutcome::Cancelled);
    assert_eq!(view.records().len(), 1);
}

#[tokio::test]
async fn test_dropping_the_view_unsubscribes() {
    let h = harness();
    let view = ResumeListView::activate(h.lifecycle.clone(), &h.bus, "u1")
        .await
        .unwrap();
    assert_eq!(h.bus.subscriber_count(), 1);

    drop(view);
    assert_eq!(h.bus.subscriber_count(), 0);
}
