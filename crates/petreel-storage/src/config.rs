//! Storage configuration.

use std::path::PathBuf;

use crate::error::{StorageError, StorageResult};

/// Sample video served when a task has no video of its own.
pub const DEFAULT_SAMPLE_VIDEO: &str = "Chibi_Dog_Illustration_video.mp4";

/// Where uploaded photos are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactBackend {
    /// Next to the task files in the output directory
    #[default]
    Local,
    /// Cloudflare R2 bucket (S3 API)
    R2,
}

impl std::str::FromStr for ArtifactBackend {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "" => Ok(Self::Local),
            "r2" | "s3" => Ok(Self::R2),
            other => Err(StorageError::config_error(format!(
                "unknown ARTIFACT_STORE: {other}"
            ))),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding every per-task file
    pub output_dir: PathBuf,
    /// Fallback video for the result route; `None` disables the fallback
    pub sample_video_path: Option<PathBuf>,
    pub artifact_backend: ArtifactBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("Output"),
            sample_video_path: Some(PathBuf::from(DEFAULT_SAMPLE_VIDEO)),
            artifact_backend: ArtifactBackend::Local,
        }
    }
}

impl StorageConfig {
    /// Create config from environment variables.
    ///
    /// An empty `SAMPLE_VIDEO_PATH` disables the sample fallback.
    pub fn from_env() -> StorageResult<Self> {
        let defaults = Self::default();

        let output_dir = std::env::var("OUTPUT_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        let sample_video_path = match std::env::var("SAMPLE_VIDEO_PATH") {
            Ok(v) if v.trim().is_empty() => None,
            Ok(v) => Some(PathBuf::from(v)),
            Err(_) => defaults.sample_video_path,
        };

        let artifact_backend = match std::env::var("ARTIFACT_STORE") {
            Ok(v) => v.parse()?,
            Err(_) => ArtifactBackend::Local,
        };

        Ok(Self {
            output_dir,
            sample_video_path,
            artifact_backend,
        })
    }

    /// Config rooted at a given directory, without a sample fallback.
    pub fn for_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            sample_video_path: None,
            artifact_backend: ArtifactBackend::Local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!("local".parse::<ArtifactBackend>().unwrap(), ArtifactBackend::Local);
        assert_eq!("R2".parse::<ArtifactBackend>().unwrap(), ArtifactBackend::R2);
        assert!("gcs".parse::<ArtifactBackend>().is_err());
    }

    #[test]
    fn test_for_dir_has_no_sample() {
        let config = StorageConfig::for_dir("/tmp/out");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert!(config.sample_video_path.is_none());
    }
}
