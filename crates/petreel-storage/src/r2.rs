//! Cloudflare R2 artifact store.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use petreel_models::TaskId;
use tracing::{debug, info};

use crate::artifacts::{photo_content_type, ArtifactStore};
use crate::error::{StorageError, StorageResult};
use crate::layout::check_task_id;

/// Lifetime of presigned photo URLs handed to the worker.
const PRESIGN_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Configuration for the R2 store.
#[derive(Debug, Clone)]
pub struct R2Config {
    /// R2 endpoint URL (S3 API endpoint)
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Region (usually "auto" for R2)
    pub region: String,
    /// Public bucket URL; photo URLs are presigned when unset
    pub public_base_url: Option<String>,
    /// Key prefix for uploaded photos
    pub key_prefix: String,
}

impl R2Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: required("R2_ENDPOINT_URL")?,
            access_key_id: required("R2_ACCESS_KEY_ID")?,
            secret_access_key: required("R2_SECRET_ACCESS_KEY")?,
            bucket_name: required("R2_BUCKET_NAME")?,
            region: std::env::var("R2_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_base_url: std::env::var("R2_PUBLIC_BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            key_prefix: std::env::var("R2_KEY_PREFIX").unwrap_or_else(|_| "uploads".to_string()),
        })
    }

    /// Object key for a task's photo.
    pub fn photo_key(&self, id: &TaskId, ext: &str) -> String {
        let prefix = self.key_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{id}.{ext}")
        } else {
            format!("{prefix}/{id}.{ext}")
        }
    }

    /// Public URL of an object, if the bucket is public.
    pub fn public_url(&self, key: &str) -> Option<String> {
        self.public_base_url
            .as_ref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), key))
    }
}

fn required(name: &str) -> StorageResult<String> {
    std::env::var(name).map_err(|_| StorageError::config_error(format!("{name} not set")))
}

/// Photos stored in an R2 bucket.
#[derive(Clone)]
pub struct R2ArtifactStore {
    client: Client,
    config: R2Config,
}

impl R2ArtifactStore {
    pub fn new(config: R2Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "r2",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            config,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(R2Config::from_env()?))
    }

    async fn presign_get(&self, key: &str) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(PRESIGN_TTL)
            .map_err(|e| StorageError::AwsSdk(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.config.bucket_name)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::AwsSdk(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }
}

#[async_trait]
impl ArtifactStore for R2ArtifactStore {
    async fn store_photo(&self, id: &TaskId, ext: &str, data: Vec<u8>) -> StorageResult<String> {
        check_task_id(id)?;
        let key = self.config.photo_key(id, ext);
        debug!(task_id = %id, "Uploading {} bytes to {}", data.len(), key);

        self.client
            .put_object()
            .bucket(&self.config.bucket_name)
            .key(&key)
            .body(ByteStream::from(data))
            .content_type(photo_content_type(ext))
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        let location = match self.config.public_url(&key) {
            Some(url) => url,
            None => self.presign_get(&key).await?,
        };
        info!(task_id = %id, "Uploaded photo to {}", key);
        Ok(location)
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket_name)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("R2 connectivity check failed: {}", e)))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "r2"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> R2Config {
        R2Config {
            endpoint_url: "https://acct.r2.cloudflarestorage.com".into(),
            access_key_id: "key".into(),
            secret_access_key: "secret".into(),
            bucket_name: "petreel".into(),
            region: "auto".into(),
            public_base_url: Some("https://media.example.com/".into()),
            key_prefix: "/uploads/".into(),
        }
    }

    #[test]
    fn test_photo_key_and_public_url() {
        let config = config();
        let key = config.photo_key(&TaskId::from("T1"), "png");
        assert_eq!(key, "uploads/T1.png");
        assert_eq!(
            config.public_url(&key).as_deref(),
            Some("https://media.example.com/uploads/T1.png")
        );
    }

    #[test]
    fn test_private_bucket_has_no_public_url() {
        let config = R2Config {
            public_base_url: None,
            key_prefix: String::new(),
            ..config()
        };
        assert_eq!(config.photo_key(&TaskId::from("T1"), "jpg"), "T1.jpg");
        assert!(config.public_url("T1.jpg").is_none());
    }
}
