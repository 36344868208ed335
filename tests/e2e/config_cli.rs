//! E2E tests for configuration and offline previews
//!
//! Endpoints point at a closed local port; the previews exercised here
//! (audio, video, unsupported) are built without contacting it.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cpv() -> Command {
    Command::cargo_bin("cpv").unwrap()
}

fn offline_config(dir: &TempDir) -> String {
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[endpoints]
api_gateway = "http://127.0.0.1:9/api"
binary_api_gateway = "http://127.0.0.1:9/api"
s3_proxy = "http://127.0.0.1:9/proxy"
registry = "http://127.0.0.1:9"
s3 = "http://127.0.0.1:9"
"#,
    )
    .unwrap();
    path.display().to_string()
}

// =============================================================================
// Config File Handling
// =============================================================================

#[test]
fn help_mentions_config_file() {
    cpv()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn missing_config_file_returns_exit_code_3() {
    cpv()
        .args(["--config", "/nonexistent/cpv/config.toml", "s3://b/song.mp3"])
        .assert()
        .code(3);
}

#[test]
fn invalid_config_file_returns_exit_code_3() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "invalid toml {{{{").unwrap();

    cpv()
        .args(["--config", path.to_str().unwrap(), "s3://b/song.mp3"])
        .assert()
        .code(3);
}

// =============================================================================
// Offline Previews
// =============================================================================

#[test]
fn audio_preview_prints_transcode_url() {
    let dir = TempDir::new().unwrap();
    cpv()
        .args(["--config", &offline_config(&dir), "s3://b/music/song.mp3"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "audio: http://127.0.0.1:9/api/transcode?url=",
        ))
        .stdout(predicate::str::contains("format=audio%2Fmpeg"));
}

#[test]
fn video_mode_hint_overrides_extension() {
    let dir = TempDir::new().unwrap();
    cpv()
        .args([
            "--config",
            &offline_config(&dir),
            "--mode",
            "video",
            "s3://b/clip.bin",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("format=video%2Fmp4"));
}

#[test]
fn unsupported_object_offers_download() {
    let dir = TempDir::new().unwrap();
    cpv()
        .args(["--config", &offline_config(&dir), "s3://b/blob.bin"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Preview Not Available"))
        .stdout(predicate::str::contains("Download: http://127.0.0.1:9/b/blob.bin"));
}
