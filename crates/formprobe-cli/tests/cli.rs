//! Smoke tests for the formprobe binary
//!
//! None of these start a browser.

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Command for the formprobe binary with a clean environment
fn formprobe() -> Command {
    let mut cmd = Command::cargo_bin("formprobe").expect("formprobe binary should exist");
    for key in [
        "FORMPROBE_BASE_URL",
        "FORMPROBE_EMAIL",
        "FORMPROBE_PASSWORD",
        "FORMPROBE_HEADLESS",
        "CHROMIUM_PATH",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

// ============================================================================
// Help
// ============================================================================

#[test]
fn test_help_lists_subcommands() {
    formprobe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_flag() {
    formprobe()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_subcommand_required() {
    formprobe().assert().failure();
}

#[test]
fn test_run_help_mentions_filter() {
    formprobe()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--filter"))
        .stdout(predicate::str::contains("--fail-fast"));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_defaults_as_yaml() {
    let dir = TempDir::new().unwrap();
    formprobe()
        .current_dir(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: https://dev-dash.janitri.in/"))
        .stdout(predicate::str::contains("poll_interval_ms: 250"));
}

#[test]
fn test_config_file_and_env_layers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("site.yaml");
    fs::write(
        &path,
        "base_url: https://staging.example.test/login\nlogin_host: staging.example.test\nwait:\n  timeout_ms: 4000\n",
    )
    .unwrap();

    formprobe()
        .current_dir(dir.path())
        .env("FORMPROBE_EMAIL", "qa@example.test")
        .args(["config", "--format", "json", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"base_url\": \"https://staging.example.test/login\""))
        .stdout(predicate::str::contains("\"timeout_ms\": 4000"))
        .stdout(predicate::str::contains("qa@example.test"));
}

#[test]
fn test_invalid_config_fails_with_exit_code_one() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("formprobe.yaml"), "base_url: \"\"\n").unwrap();

    formprobe()
        .current_dir(dir.path())
        .arg("config")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("base_url must not be empty"));
}

// ============================================================================
// Run
// ============================================================================

#[test]
fn test_run_list_prints_matching_scenarios() {
    let dir = TempDir::new().unwrap();
    formprobe()
        .current_dir(dir.path())
        .args(["run", "--list", "--filter", "^invalid_"])
        .assert()
        .success()
        .stdout(predicate::str::contains("invalid_email"))
        .stdout(predicate::str::contains("invalid_password"))
        .stdout(predicate::str::contains("eye_icon").not());
}

#[test]
fn test_run_rejects_bad_filter() {
    let dir = TempDir::new().unwrap();
    formprobe()
        .current_dir(dir.path())
        .args(["run", "--list", "--filter", "("])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid argument"));
}
