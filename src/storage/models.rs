use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The document types a resume may be uploaded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResumeMime {
    Pdf,
    /// Legacy Word (`.doc`)
    Doc,
    /// OOXML Word (`.docx`)
    Docx,
}

impl ResumeMime {
    pub const ALL: [ResumeMime; 3] = [ResumeMime::Pdf, ResumeMime::Doc, ResumeMime::Docx];

    /// Match a MIME type string against the allow-list. Parameters such as
    /// `; charset=...` are ignored.
    pub fn parse(mime_type: &str) -> Option<Self> {
        let essence = mime_type.split(';').next().unwrap_or("").trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(essence))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResumeMime::Pdf => "application/pdf",
            ResumeMime::Doc => "application/msword",
            ResumeMime::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl std::fmt::Display for ResumeMime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ResumeMime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ResumeMime::parse(&value).ok_or_else(|| format!("unsupported resume type: {value}"))
    }
}

impl From<ResumeMime> for String {
    fn from(m: ResumeMime) -> Self {
        m.as_str().to_string()
    }
}

/// A resume row stored in redb. The blob lives in the object store under `storage_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub id: String,
    pub owner_id: String,
    pub display_name: String,
    pub storage_key: String,
    pub size_bytes: u64,
    pub mime_type: ResumeMime,
    pub uploaded_at: DateTime<Utc>,
}

/// Insertable form of a [`ResumeRecord`]; the table assigns `id` and `uploaded_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewResume {
    pub owner_id: String,
    pub display_name: String,
    pub storage_key: String,
    pub size_bytes: u64,
    pub mime_type: ResumeMime,
}

/// Row filter for select/delete. Always scoped to one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub owner_id: String,
    pub id: Option<String>,
}

impl RecordFilter {
    pub fn owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            id: None,
        }
    }

    pub fn record(owner_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            id: Some(id.into()),
        }
    }

    pub fn matches(&self, record: &ResumeRecord) -> bool {
        record.owner_id == self.owner_id && self.id.as_ref().map_or(true, |id| *id == record.id)
    }
}
