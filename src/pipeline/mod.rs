use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::extractors::{validate_url, AudioExtractor, VideoMetadata};
use crate::storage::{object_key, validate_id, ObjectStore};
use crate::utils;

/// Body of `POST /extract`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub url: String,
    pub user_id: String,
    pub transcription_id: String,
}

/// Successful extraction result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub status: String,

    /// Public URL of the uploaded audio
    pub r2_url: String,

    pub metadata: VideoMetadata,
}

/// Extract-then-upload pipeline shared by the HTTP handler and the CLI
pub struct ExtractionPipeline {
    extractor: Arc<dyn AudioExtractor>,
    store: Arc<dyn ObjectStore>,
    key_prefix: String,
    temp_root: Option<PathBuf>,
}

impl ExtractionPipeline {
    pub fn new(
        config: &Config,
        extractor: Arc<dyn AudioExtractor>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            extractor,
            store,
            key_prefix: config.storage.key_prefix.clone(),
            temp_root: config.app.temp_dir.clone(),
        }
    }

    /// Validate the request, run the tool, upload the file and describe the result
    pub async fn run(&self, request: &ExtractRequest) -> Result<ExtractResponse> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "extract",
            %request_id,
            user_id = %request.user_id,
            transcription_id = %request.transcription_id
        );

        self.run_inner(request).instrument(span).await
    }

    async fn run_inner(&self, request: &ExtractRequest) -> Result<ExtractResponse> {
        let url = validate_url(&request.url)?;
        validate_id("user_id", &request.user_id)?;
        validate_id("transcription_id", &request.transcription_id)?;

        let started = Instant::now();
        tracing::info!("Starting extraction for URL: {}", url);

        // Removed when dropped: on success, on error, and when the request is cancelled
        let work_dir = self.create_work_dir()?;

        let audio = self
            .extractor
            .extract(url.as_str(), work_dir.path())
            .await?;

        tracing::info!(
            "Extracted \"{}\" ({}, {} bytes)",
            audio.metadata.title,
            utils::format_duration(audio.metadata.duration),
            audio.size_bytes
        );

        let key = object_key(&self.key_prefix, &request.user_id, &request.transcription_id);
        self.store
            .put_file(&key, &audio.path, audio.format.mime_type())
            .await?;

        let r2_url = self.store.public_url(&key);
        tracing::info!("Extraction completed in {:?}: {}", started.elapsed(), r2_url);

        Ok(ExtractResponse {
            status: "completed".to_string(),
            r2_url,
            metadata: audio.metadata,
        })
    }

    /// Version of the underlying extraction tool
    pub async fn tool_version(&self) -> Result<String> {
        self.extractor.version().await
    }

    fn create_work_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("extract-");

        let dir = match &self.temp_root {
            Some(root) => {
                fs_err::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .context("Failed to create temporary directory")?;

        tracing::debug!("Working directory: {}", dir.path().display());
        Ok(dir)
    }
}
