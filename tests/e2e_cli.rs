//! CLI end-to-end tests
//!
//! Tests for the reelname command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the reelname binary
#[allow(deprecated)]
fn reelname_cmd() -> Command {
    let mut cmd = Command::cargo_bin("reelname").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = reelname_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = reelname_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("reelname"))
        .stdout(predicate::str::contains("rename"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_cli_version_flag() {
    let mut cmd = reelname_cmd();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("reelname"));
}

#[test]
fn test_cli_check_tools_command() {
    let mut cmd = reelname_cmd();
    cmd.arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("mediainfo"))
        .stdout(predicate::str::contains("ffprobe"));
}

#[test]
fn test_cli_probe_nonexistent_file() {
    let mut cmd = reelname_cmd();
    cmd.args(["probe", "/nonexistent/path/movie.mkv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_rename_missing_root() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("config.toml");
    fs::write(&config_file, "").unwrap();

    let mut cmd = reelname_cmd();
    cmd.args(["--config", config_file.to_str().unwrap()])
        .args(["rename", "/nonexistent/media"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a file or directory"));
}

#[test]
fn test_cli_config_path_uses_flag() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("custom.toml");

    let mut cmd = reelname_cmd();
    cmd.args(["--config", config_file.to_str().unwrap(), "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_cli_config_init_then_validate() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("nested/reelname.toml");
    let config_arg = config_file.to_str().unwrap();

    reelname_cmd()
        .args(["--config", config_arg, "config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote default config"));
    assert!(config_file.exists());

    reelname_cmd()
        .args(["--config", config_arg, "config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    reelname_cmd()
        .args(["--config", config_arg, "config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_cli_validate_rejects_unknown_variable() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("config.toml");
    fs::write(&config_file, "[movie]\ntemplate = [\"{{title}}\"]\n").unwrap();

    reelname_cmd()
        .args(["--config", config_file.to_str().unwrap(), "config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("title"));
}

#[test]
fn test_cli_rename_rejects_bad_template_before_touching_files() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("config.toml");
    fs::write(&config_file, "[series]\ntemplate = [\"{{n\"]\n").unwrap();
    let media = temp.path().join("media");
    fs::create_dir(&media).unwrap();
    fs::write(media.join("Show.S01E01.mkv"), b"").unwrap();

    reelname_cmd()
        .args(["--config", config_file.to_str().unwrap()])
        .arg("rename")
        .arg(&media)
        .assert()
        .failure();
    assert!(media.join("Show.S01E01.mkv").exists());
}
