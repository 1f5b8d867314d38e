use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// A tool that does not answer `--version` within this long counts as missing
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Render a yt-dlp duration (whole seconds) as `1h 2m 3s`
pub fn format_duration(seconds: u64) -> String {
    match (seconds / 3600, seconds % 3600 / 60, seconds % 60) {
        (0, 0, secs) => format!("{}s", secs),
        (0, minutes, secs) => format!("{}m {}s", minutes, secs),
        (hours, minutes, secs) => format!("{}h {}m {}s", hours, minutes, secs),
    }
}

/// Check if the current environment has the external tools the service shells out to
pub async fn check_dependencies(ytdlp_path: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(ytdlp_path).await {
        missing.push(format!("{} - required for audio extraction", ytdlp_path));
    }

    // yt-dlp needs ffmpeg for --extract-audio
    if !check_command_available("ffmpeg").await {
        missing.push("ffmpeg - required by yt-dlp for audio conversion".to_string());
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    let arg = if command.ends_with("ffmpeg") { "-version" } else { "--version" };

    let mut cmd = Command::new(command);
    cmd.arg(arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match tokio::time::timeout(CHECK_TIMEOUT, cmd.status()).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(_)) => false,
        Err(_) => {
            tracing::warn!("{} {} did not answer within {:?}", command, arg, CHECK_TIMEOUT);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(30), "30s");
        assert_eq!(format_duration(212), "3m 32s");
        assert_eq!(format_duration(3600), "1h 0m 0s");
        assert_eq!(format_duration(3661), "1h 1m 1s");
    }

    #[tokio::test]
    async fn test_missing_command_is_reported() {
        let missing = check_dependencies("/nonexistent/yt-dlp").await;
        assert!(missing.iter().any(|m| m.starts_with("/nonexistent/yt-dlp")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_command_counts_as_missing() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Instant;

        let dir = tempfile::TempDir::new().unwrap();
        let tool = dir.path().join("yt-dlp");
        std::fs::write(&tool, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let started = Instant::now();
        assert!(!check_command_available(tool.to_str().unwrap()).await);
        assert!(started.elapsed() < CHECK_TIMEOUT + Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_answering_command_is_available() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let tool = dir.path().join("yt-dlp");
        std::fs::write(&tool, "#!/bin/sh\necho 2024.08.06\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert!(check_command_available(tool.to_str().unwrap()).await);
    }
}
