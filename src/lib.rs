//! Audio Extractor - a small HTTP service that pulls audio out of video URLs
//!
//! The service shells out to yt-dlp to download and convert the audio track,
//! uploads the resulting file to an S3-compatible bucket (Cloudflare R2 in
//! production) and answers with the public URL plus basic video metadata.

pub mod api;
pub mod cli;
pub mod config;
pub mod extractors;
pub mod output;
pub mod pipeline;
pub mod storage;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use extractors::{AudioExtractor, ExtractedAudio, VideoMetadata};
pub use pipeline::{ExtractRequest, ExtractResponse, ExtractionPipeline};
pub use storage::ObjectStore;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the extractor service
#[derive(thiserror::Error, Debug)]
pub enum ExtractorError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Extraction tool not found: {0}")]
    ToolNotFound(String),

    #[error("Audio extraction failed: {0}")]
    ToolFailed(String),

    #[error("Audio extraction timed out after {0}s")]
    Timeout(u64),

    #[error("Extraction tool produced no audio file in {0}")]
    OutputMissing(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
