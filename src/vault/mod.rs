//! The resume vault: uploads with blob compensation, plus list, download and
//! delete over both halves of each resume.

pub mod error;
pub mod keys;
pub mod lifecycle;
pub mod listing;
pub mod saga;
pub mod upload;

pub use error::VaultError;
pub use lifecycle::{Confirm, DeleteOutcome, Download, Lifecycle};
pub use listing::ResumeListView;
pub use upload::{CandidateFile, Uploader, DEFAULT_MAX_UPLOAD_SIZE};
