//! Shared data models for the PetReel backend.
//!
//! This crate provides Serde-serializable types for:
//! - Task records and the task status lifecycle
//! - Queue jobs handed to the external video worker and the results it reports
//! - Upload validation rules shared by the API and the client

pub mod error;
pub mod job;
pub mod task;
pub mod timestamp;
pub mod upload;

// Re-export common types
pub use error::{ModelError, ModelResult};
pub use job::{JobOutcome, JobResult, VideoJob, PRODUCT_TITLE};
pub use task::{is_remote_url, stages, TaskId, TaskRecord, TaskStatus};
pub use upload::{is_valid_task_id, photo_extension, UploadFields, ALLOWED_PHOTO_EXTENSIONS};
