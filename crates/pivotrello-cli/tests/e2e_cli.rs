//! E2E tests for the paths that fail or finish before any network call.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn pivotrello_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pivotrello"));
    cmd.env("PIVOTRELLO_LOG", "error");
    cmd.env("HOME", home);
    cmd.env("XDG_CONFIG_HOME", home.join(".config"));
    for var in [
        "PIVOTAL_TOKEN",
        "TRELLO_KEY",
        "TRELLO_TOKEN",
        "PIVOTRELLO_FORMAT",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn empty_config(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, "").unwrap();
    path
}

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().unwrap();
    pivotrello_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("duplicates"))
        .stdout(predicate::str::contains("wipe"));
}

#[test]
fn import_help_documents_resume() {
    let dir = TempDir::new().unwrap();
    pivotrello_cmd(dir.path())
        .args(["import", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--resume-after"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn missing_trello_credentials_fail_with_code() {
    let dir = TempDir::new().unwrap();
    let config = empty_config(&dir);
    pivotrello_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("boards")
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1002"))
        .stderr(predicate::str::contains("--trello-key"));
}

#[test]
fn missing_pivotal_token_fails_as_json() {
    let dir = TempDir::new().unwrap();
    let config = empty_config(&dir);
    let output = pivotrello_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["projects", "--json"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let body: Value = serde_json::from_slice(&output.stderr).expect("JSON error on stderr");
    assert_eq!(body["error"]["error_code"], "E1002");
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("PIVOTAL_TOKEN")
    );
}

#[test]
fn credentials_from_config_get_past_the_check() {
    // Only the Trello pair is configured, so import stops at the Pivotal token.
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[trello]\nkey = \"k\"\ntoken = \"t\"\n").unwrap();

    pivotrello_cmd(dir.path())
        .arg("--config")
        .arg(&path)
        .arg("import")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Pivotal Tracker token"));
}

#[test]
fn malformed_config_reports_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[retry\nmax_retries = ").unwrap();

    pivotrello_cmd(dir.path())
        .arg("--config")
        .arg(&path)
        .arg("boards")
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"));
}

#[test]
fn missing_explicit_config_fails() {
    let dir = TempDir::new().unwrap();
    pivotrello_cmd(dir.path())
        .args(["--config", "/nonexistent/pivotrello.toml", "boards"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn completions_are_generated() {
    let dir = TempDir::new().unwrap();
    pivotrello_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pivotrello"));
}
