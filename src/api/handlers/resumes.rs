use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::auth::AuthUser;
use crate::api::response::{ApiError, AppQuery, JSend};
use crate::storage::models::{ResumeMime, ResumeRecord};
use crate::vault::{CandidateFile, DeleteOutcome, ResumeListView};
use crate::AppState;

const MAX_WATCH_SECS: u64 = 120;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ResumeResponse {
    pub display_name: String,
    pub id: String,
    pub mime_type: ResumeMime,
    pub size_bytes: u64,
    pub uploaded_at: String,
}

#[derive(Debug, Serialize)]
pub struct ResumeListResponse {
    pub items: Vec<ResumeResponse>,
}

#[derive(Debug, Serialize)]
pub struct WatchResponse {
    /// False when the wait timed out without a new upload.
    pub changed: bool,
    pub items: Vec<ResumeResponse>,
}

#[derive(Debug, Deserialize)]
pub struct WatchParams {
    #[serde(default = "default_watch_secs")]
    pub timeout_secs: u64,
}

fn default_watch_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_resume(
    State(state): State<Arc<AppState>>,
    AuthUser(owner_id): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<JSend<ResumeResponse>>, ApiError> {
    let mut candidate: Option<CandidateFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("file field must carry a filename"))?;

        // Declared Content-Type, or a guess from the name when the client sent none
        let mime_type = field
            .content_type()
            .filter(|ct| *ct != "application/octet-stream")
            .map(str::to_string)
            .or_else(|| mime_guess::from_path(&name).first().map(|m| m.to_string()))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let data = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::payload_too_large(format!(
                    "File exceeds maximum upload size of {} bytes",
                    state.config.max_upload_size
                ))
            } else {
                ApiError::bad_request(format!("Failed to read file: {e}"))
            }
        })?;

        candidate = Some(CandidateFile::new(name, mime_type, data));
    }

    let candidate = candidate.ok_or_else(|| ApiError::bad_request("file field is required"))?;
    let record = state.uploader.submit(candidate, &owner_id).await?;

    Ok(JSend::success(to_response(&record)))
}

pub async fn list_resumes(
    State(state): State<Arc<AppState>>,
    AuthUser(owner_id): AuthUser,
) -> Result<Json<JSend<ResumeListResponse>>, ApiError> {
    let records = state.lifecycle.list(&owner_id).await?;

    Ok(JSend::success(ResumeListResponse {
        items: records.iter().map(to_response).collect(),
    }))
}

/// Long-poll: hold the request until the caller's next upload lands (or the
/// timeout passes), then answer with the current list.
pub async fn watch_resumes(
    State(state): State<Arc<AppState>>,
    AuthUser(owner_id): AuthUser,
    AppQuery(params): AppQuery<WatchParams>,
) -> Result<Json<JSend<WatchResponse>>, ApiError> {
    if params.timeout_secs == 0 || params.timeout_secs > MAX_WATCH_SECS {
        return Err(ApiError::bad_request(format!(
            "timeout_secs must be between 1 and {MAX_WATCH_SECS}"
        )));
    }

    let mut view =
        ResumeListView::activate(state.lifecycle.clone(), &state.bus, owner_id).await?;

    let wait = Duration::from_secs(params.timeout_secs);
    let changed = match tokio::time::timeout(wait, view.next_upload()).await {
        Ok(Some(refreshed)) => {
            refreshed?;
            true
        }
        Ok(None) | Err(_) => false,
    };

    Ok(JSend::success(WatchResponse {
        changed,
        items: view.records().iter().map(to_response).collect(),
    }))
}

pub async fn download_resume(
    State(state): State<Arc<AppState>>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let record = state.lifecycle.find(&owner_id, &id).await?;
    let download = state.lifecycle.download(&record).await?;

    let content_length = download.data.len() as u64;
    let mut response = (StatusCode::OK, download.data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(download.mime_type.as_str()),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
    if let Ok(value) = HeaderValue::from_str(&content_disposition(&download.display_name)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, no-store"),
    );

    Ok(response)
}

pub async fn delete_resume(
    State(state): State<Arc<AppState>>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<String>,
    AppQuery(params): AppQuery<DeleteParams>,
) -> Result<Json<JSend<()>>, ApiError> {
    let record = state.lifecycle.find(&owner_id, &id).await?;

    match state.lifecycle.delete(&record, params.confirm).await? {
        DeleteOutcome::Deleted => Ok(JSend::success(())),
        DeleteOutcome::Cancelled => Err(ApiError::bad_request(
            "deletion must be confirmed with confirm=true",
        )),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn to_response(record: &ResumeRecord) -> ResumeResponse {
    ResumeResponse {
        display_name: record.display_name.clone(),
        id: record.id.clone(),
        mime_type: record.mime_type,
        size_bytes: record.size_bytes,
        uploaded_at: record.uploaded_at.to_rfc3339(),
    }
}

/// `attachment` disposition naming the original file. Non-ASCII names go in
/// the RFC 5987 `filename*` parameter with an ASCII fallback alongside.
fn content_disposition(display_name: &str) -> String {
    let fallback: String = display_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(display_name)
    )
}
