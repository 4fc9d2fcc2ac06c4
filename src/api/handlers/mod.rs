mod health;
mod resumes;

pub use health::health;
pub use resumes::{delete_resume, download_resume, list_resumes, upload_resume, watch_resumes};
