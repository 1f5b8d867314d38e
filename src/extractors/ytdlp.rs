use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

use super::{AudioExtractor, AudioFormat, ExtractedAudio, VideoMetadata};
use crate::config::ExtractorConfig;
use crate::{ExtractorError, Result};

const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Audio extractor backed by the yt-dlp command-line tool
pub struct YtDlpExtractor {
    config: ExtractorConfig,
    format: AudioFormat,
}

impl YtDlpExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            format: AudioFormat::Mp3,
        }
    }

    /// Build the full yt-dlp argument list for one download
    pub fn build_args(&self, url: &str, work_dir: &Path) -> Vec<String> {
        let template = work_dir.join("%(id)s.%(ext)s");

        let mut args: Vec<String> = vec![
            "--format".into(),
            "bestaudio/best".into(),
            "--extract-audio".into(),
            "--audio-format".into(),
            self.format.as_str().into(),
            "--audio-quality".into(),
            "0".into(),
            "--output".into(),
            template.to_string_lossy().into_owned(),
            "--no-playlist".into(),
            // Print the info JSON on stdout and still download
            "--dump-json".into(),
            "--no-simulate".into(),
            "--no-progress".into(),
            "--retries".into(),
            self.config.retries.to_string(),
            "--fragment-retries".into(),
            self.config.fragment_retries.to_string(),
            "--retry-sleep".into(),
            "http:exp=5".into(),
            "--retry-sleep".into(),
            "fragment:exp=2".into(),
        ];

        if self.config.cookie_path.is_file() {
            args.push("--cookies".into());
            args.push(self.config.cookie_path.to_string_lossy().into_owned());
        } else {
            tracing::debug!(
                "Cookie file not found, continuing without: {}",
                self.config.cookie_path.display()
            );
        }

        if let Some(proxy) = &self.config.proxy_url {
            args.push("--proxy".into());
            args.push(proxy.clone());
        }

        if let Some(target) = &self.config.impersonate {
            args.push("--impersonate".into());
            args.push(target.clone());
        }

        args.extend(self.config.extra_args.iter().cloned());

        // Everything after `--` is positional, so a URL can never be read as a flag
        args.push("--".into());
        args.push(url.to_string());

        args
    }

    fn spawn_error(&self, err: std::io::Error) -> anyhow::Error {
        if err.kind() == ErrorKind::NotFound {
            ExtractorError::ToolNotFound(format!(
                "{} (install it: https://github.com/yt-dlp/yt-dlp)",
                self.config.ytdlp_path
            ))
            .into()
        } else {
            anyhow::Error::new(err).context(format!("Failed to run {}", self.config.ytdlp_path))
        }
    }

    /// Find the audio file yt-dlp left in the working directory
    fn locate_output(&self, work_dir: &Path, video_id: &str) -> Result<PathBuf> {
        let ext = self.format.as_str();

        if !video_id.is_empty() {
            let expected = work_dir.join(format!("{}.{}", video_id, ext));
            if expected.is_file() {
                return Ok(expected);
            }
        }

        let mut candidates = Vec::new();
        for entry in fs_err::read_dir(work_dir)? {
            let path = entry?.path();
            let matches_ext = path
                .extension()
                .map(|found| found.to_string_lossy().eq_ignore_ascii_case(ext))
                .unwrap_or(false);
            if matches_ext && path.is_file() {
                candidates.push(path);
            }
        }

        match candidates.len() {
            1 => {
                let path = candidates.remove(0);
                tracing::debug!("Using fallback output file: {}", path.display());
                Ok(path)
            }
            _ => Err(ExtractorError::OutputMissing(work_dir.display().to_string()).into()),
        }
    }
}

#[async_trait]
impl AudioExtractor for YtDlpExtractor {
    async fn extract(&self, url: &str, work_dir: &Path) -> Result<ExtractedAudio> {
        let args = self.build_args(url, work_dir);
        let started = Instant::now();

        tracing::debug!("Running {} {}", self.config.ytdlp_path, args.join(" "));

        let mut command = Command::new(&self.config.ytdlp_path);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // yt-dlp leads its own process group so ffmpeg and friends die with it
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|e| self.spawn_error(e))?;
        let mut group = ProcessGroupGuard::new(child.id());

        let output = match timeout(
            Duration::from_secs(self.config.timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(result) => {
                group.disarm();
                result.context("Failed to wait for yt-dlp")?
            }
            Err(_) => {
                tracing::warn!(
                    "yt-dlp exceeded {}s for {}, killing its process group",
                    self.config.timeout_secs,
                    url
                );
                return Err(ExtractorError::Timeout(self.config.timeout_secs).into());
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                "yt-dlp exited with {} after {:?}: {}",
                output.status,
                started.elapsed(),
                stderr.trim()
            );
            return Err(ExtractorError::ToolFailed(classify_failure(&stderr)).into());
        }

        let info = parse_info(&output.stdout)?;
        let metadata = metadata_from_info(&info);
        let path = self.locate_output(work_dir, &metadata.video_id)?;
        let size_bytes = fs_err::tokio::metadata(&path).await?.len();

        tracing::info!(
            "yt-dlp finished in {:?}: {} ({} bytes)",
            started.elapsed(),
            metadata.video_id,
            size_bytes
        );

        Ok(ExtractedAudio {
            path,
            format: self.format,
            size_bytes,
            metadata,
        })
    }

    async fn version(&self) -> Result<String> {
        let output = timeout(
            VERSION_TIMEOUT,
            Command::new(&self.config.ytdlp_path)
                .arg("--version")
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| ExtractorError::Timeout(VERSION_TIMEOUT.as_secs()))?
        .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            anyhow::bail!("{} --version exited with {}", self.config.ytdlp_path, output.status);
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Kills the tool's whole process group when dropped while still armed.
///
/// Covers both the timeout path and cancellation of the extract future.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    // SAFETY: killpg only sends a signal; the group id came from a child we spawned
    let rc = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!("Failed to kill process group {}: {}", pgid, err);
        }
    } else {
        tracing::debug!("Killed process group {}", pgid);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

/// Parse the info JSON from yt-dlp stdout, taking the last JSON line
fn parse_info(stdout: &[u8]) -> Result<Value> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('{'))
        .ok_or_else(|| ExtractorError::ToolFailed("yt-dlp printed no video info".to_string()))?;

    serde_json::from_str(line).context("yt-dlp returned invalid JSON")
}

fn metadata_from_info(info: &Value) -> VideoMetadata {
    let text = |key: &str| info[key].as_str().filter(|s| !s.is_empty()).map(str::to_string);

    let duration = info["duration"]
        .as_f64()
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| d.round() as u64)
        .unwrap_or(0);

    VideoMetadata {
        title: text("title").unwrap_or_default(),
        duration,
        channel: text("channel").or_else(|| text("uploader")).unwrap_or_default(),
        video_id: text("id").unwrap_or_default(),
    }
}

/// Turn yt-dlp stderr into a short, readable failure reason
fn classify_failure(stderr: &str) -> String {
    let lower = stderr.to_lowercase();

    let known = if lower.contains("http error 429") || lower.contains("too many requests") {
        Some("Rate limited by the video source (HTTP 429)")
    } else if lower.contains("sign in to confirm") || lower.contains("login required") {
        Some("Video source requires sign-in; refresh the cookie file")
    } else if lower.contains("private video") {
        Some("This video is private")
    } else if lower.contains("geo") && lower.contains("block") {
        Some("Video is restricted in this region")
    } else if lower.contains("unsupported url") {
        Some("Unsupported URL")
    } else if lower.contains("video unavailable") || lower.contains("has been removed") {
        Some("Video unavailable or removed")
    } else if lower.contains("http error 403") {
        Some("Access denied by the video source (HTTP 403)")
    } else if lower.contains("ffmpeg") && (lower.contains("not found") || lower.contains("no such file")) {
        Some("ffmpeg not found; it is required for audio conversion")
    } else {
        None
    };

    match known {
        Some(reason) => reason.to_string(),
        None => stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("yt-dlp exited with an error")
            .to_string(),
    }
}
