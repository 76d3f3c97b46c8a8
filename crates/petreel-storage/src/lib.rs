//! Local task storage for the PetReel backend.
//!
//! This crate provides:
//! - The status store (`{id}_status.json`) with atomic, conditional writes
//! - Per-task processing logs and result URL scraping
//! - Photo storage on local disk or Cloudflare R2
//! - Lookup of generated videos in the output directory

pub mod artifacts;
pub mod config;
pub mod error;
pub mod layout;
pub mod r2;
pub mod status;
pub mod task_log;
pub mod video;

pub use artifacts::{photo_content_type, ArtifactStore, LocalArtifactStore};
pub use config::{ArtifactBackend, StorageConfig, DEFAULT_SAMPLE_VIDEO};
pub use error::{StorageError, StorageResult};
pub use layout::OutputLayout;
pub use r2::{R2ArtifactStore, R2Config};
pub use status::{StatusStore, WriteOutcome};
pub use task_log::{extract_result_url, TaskLog};
pub use video::VideoLocator;
