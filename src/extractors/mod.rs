use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

pub mod ytdlp;

pub use ytdlp::YtDlpExtractor;

use crate::{ExtractorError, Result};

/// Metadata reported by the extraction tool for a single video
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,

    /// Duration in whole seconds
    pub duration: u64,

    pub channel: String,

    pub video_id: String,
}

/// Audio file produced inside a caller-owned working directory
#[derive(Debug, Clone)]
pub struct ExtractedAudio {
    pub path: PathBuf,

    pub format: AudioFormat,

    pub size_bytes: u64,

    pub metadata: VideoMetadata,
}

/// Supported audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFormat {
    Mp3,
    M4a,
    Opus,
    Wav,
    Flac,
    Ogg,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Opus => "opus",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "m4a" | "aac" => Some(AudioFormat::M4a),
            "opus" => Some(AudioFormat::Opus),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "ogg" => Some(AudioFormat::Ogg),
            _ => None,
        }
    }

    /// Get MIME type for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Opus => "audio/opus",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Ogg => "audio/ogg",
        }
    }
}

/// Seam around the external tool that turns a video URL into a local audio file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Download the audio track of `url` into `work_dir`
    async fn extract(&self, url: &str, work_dir: &Path) -> Result<ExtractedAudio>;

    /// Version string reported by the tool
    async fn version(&self) -> Result<String>;
}

/// Validate that the input is an absolute HTTP(S) URL
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|_| ExtractorError::InvalidRequest(format!("Invalid URL format: {}", url)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ExtractorError::InvalidRequest(
            "URL must use HTTP or HTTPS protocol".to_string(),
        )
        .into());
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ExtractorError::InvalidRequest(format!("URL has no host: {}", url)).into());
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ").is_ok());
        assert!(validate_url("http://youtu.be/dQw4w9WgXcQ").is_ok());
        assert!(validate_url("  https://example.com/v  ").is_ok());
        assert!(validate_url("ftp://example.com/file").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("not-a-url").is_err());
    }

    #[test]
    fn test_invalid_url_is_classified() {
        let err = validate_url("--exec rm").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractorError>(),
            Some(ExtractorError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_audio_format_lookup() {
        assert_eq!(AudioFormat::from_extension("MP3"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_extension("aac"), Some(AudioFormat::M4a));
        assert_eq!(AudioFormat::from_extension("webm"), None);
        assert_eq!(AudioFormat::Mp3.mime_type(), "audio/mpeg");
    }
}
