//! Basic CLI tests for cpv
//!
//! Tests for command-line argument parsing, help output, version display,
//! and error handling for invalid inputs.

use assert_cmd::Command;
use predicates::prelude::*;

fn cpv() -> Command {
    Command::cargo_bin("cpv").unwrap()
}

// =============================================================================
// Help and Version
// =============================================================================

#[test]
fn help_flag_shows_usage() {
    cpv()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("USAGE:"))
        .stdout(predicate::str::contains("cpv"))
        .stdout(predicate::str::contains("--mode"));
}

#[test]
fn help_short_flag_shows_usage() {
    cpv()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("USAGE:"));
}

#[test]
fn help_lists_modes() {
    cpv()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("vega"))
        .stdout(predicate::str::contains("voila"));
}

#[test]
fn version_flag_shows_version() {
    cpv()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn version_short_flag_shows_version() {
    cpv()
        .arg("-V")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// =============================================================================
// Invalid Options (Exit Code 3)
// =============================================================================

#[test]
fn unknown_option_returns_exit_code_3() {
    cpv()
        .arg("--unknown-option")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Unknown option"));
}

#[test]
fn missing_uri_returns_exit_code_3() {
    cpv()
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Missing object URI"));
}

#[test]
fn non_s3_uri_returns_exit_code_3() {
    cpv()
        .arg("https://bucket/key.csv")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid object URI"));
}

#[test]
fn invalid_mode_returns_exit_code_3() {
    cpv()
        .args(["--mode", "spreadsheet", "s3://b/k.csv"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("unknown preview mode"));
}

#[test]
fn mode_without_value_returns_exit_code_3() {
    cpv().args(["s3://b/k.csv", "--mode"]).assert().code(3);
}

#[test]
fn package_without_logical_key_returns_exit_code_3() {
    cpv()
        .args(["s3://b/k.html", "--package", "b/user/pkg@abc"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("--logical-key"));
}

#[test]
fn malformed_package_returns_exit_code_3() {
    cpv()
        .args(["s3://b/k.html", "--package", "pkg", "--logical-key", "k.html"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid package"));
}
