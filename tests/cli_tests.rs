use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("audio-extractor").unwrap();
    // Keep the host environment out of configuration loading
    for var in [
        "CONFIG_PATH",
        "API_KEY",
        "R2_ENDPOINT",
        "R2_BUCKET_NAME",
        "R2_ACCESS_KEY_ID",
        "R2_SECRET_ACCESS_KEY",
        "R2_PUBLIC_URL",
        "EXTRACT_TIMEOUT_SECS",
    ] {
        cmd.env_remove(var);
    }
    cmd.current_dir(std::env::temp_dir());
    cmd
}

#[test]
fn help_lists_commands() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("extract"));
}

#[test]
fn config_show_masks_secrets() {
    cli()
        .args(["config", "--show"])
        .env("API_KEY", "super-secret")
        .env("R2_BUCKET_NAME", "audio-bucket")
        .assert()
        .success()
        .stdout(predicate::str::contains("audio-bucket"))
        .stdout(predicate::str::contains("super-secret").not());
}

#[test]
fn extract_without_storage_config_fails() {
    cli()
        .args([
            "--quiet",
            "extract",
            "https://youtu.be/abc123",
            "--user-id",
            "usr_1",
            "--transcription-id",
            "txn_1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("R2_ENDPOINT"));
}

#[test]
fn invalid_timeout_env_is_reported() {
    cli()
        .args(["config", "--show"])
        .env("EXTRACT_TIMEOUT_SECS", "later")
        .assert()
        .failure()
        .stderr(predicate::str::contains("EXTRACT_TIMEOUT_SECS"));
}

#[cfg(unix)]
#[test]
fn serve_shuts_down_cleanly_on_sigterm() {
    use std::io::{BufRead, BufReader};
    use std::process::{Command as StdCommand, Stdio};
    use std::time::{Duration, Instant};

    let temp = tempfile::TempDir::new().unwrap();
    let mut child = StdCommand::new(assert_cmd::cargo::cargo_bin("audio-extractor"))
        .arg("serve")
        .env_remove("CONFIG_PATH")
        .env_remove("RUST_LOG")
        .env_remove("LOG_FORMAT")
        .env("BIND_ADDRESS", "127.0.0.1:0")
        .env("API_KEY", "k")
        .env("R2_ENDPOINT", "http://127.0.0.1:9")
        .env("R2_BUCKET_NAME", "audio")
        .env("R2_ACCESS_KEY_ID", "id")
        .env("R2_SECRET_ACCESS_KEY", "secret")
        .env("R2_PUBLIC_URL", "https://pub.example.dev")
        .env("YTDLP_PATH", "/nonexistent/yt-dlp")
        .env("TEMP_DIR", temp.path())
        .current_dir(temp.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let stdout = child.stdout.take().unwrap();
    let mut lines = BufReader::new(stdout).lines();
    let listening = lines
        .by_ref()
        .map_while(Result::ok)
        .any(|line| line.contains("Listening on"));
    assert!(listening, "server never reported it was listening");

    let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGTERM) };
    assert_eq!(rc, 0);

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("server did not stop after SIGTERM");
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    // Killed by the default signal action would be a failure with no exit code
    assert!(status.success(), "unexpected exit status: {:?}", status);
    assert!(lines
        .map_while(Result::ok)
        .any(|line| line.contains("Server stopped")));
}
