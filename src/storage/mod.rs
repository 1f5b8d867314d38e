use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::path::Path;

pub mod keys;

pub use keys::{object_key, validate_id};

use crate::config::Config;
use crate::{ExtractorError, Result};

/// Durable storage that makes uploaded files publicly reachable
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file under `key`
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<()>;

    /// Public URL an uploaded object is served from
    fn public_url(&self, key: &str) -> String;
}

/// S3-compatible bucket (Cloudflare R2, MinIO, AWS S3)
pub struct S3Store {
    client: S3Client,
    bucket: String,
    public_base: String,
}

impl S3Store {
    /// Build a client for the configured endpoint with static credentials
    pub async fn new(config: &Config) -> Result<Self> {
        let storage = &config.storage;

        let credentials = Credentials::new(
            storage.access_key_id.clone(),
            storage.secret_access_key.clone(),
            None,
            None,
            "audio-extractor",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(config.storage_region())
            .endpoint_url(&storage.endpoint)
            .credentials_provider(credentials)
            .load()
            .await;

        // R2 and MinIO expect bucket-in-path addressing
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: S3Client::from_conf(s3_config),
            bucket: storage.bucket.clone(),
            public_base: storage.public_url.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<()> {
        tracing::info!("Uploading audio to s3://{}/{}", self.bucket, key);

        let body = ByteStream::from_path(path)
            .await
            .with_context(|| format!("Failed to open {} for upload", path.display()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                ExtractorError::Upload(format!(
                    "put_object {} failed: {}",
                    key,
                    aws_sdk_s3::error::DisplayErrorContext(&e)
                ))
            })?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        keys::public_url(&self.public_base, key)
    }
}
