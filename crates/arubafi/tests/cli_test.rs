//! Integration tests for the `arubafi` CLI binary.
//!
//! Argument parsing, help output, and error handling, without a live
//! Aruba backend.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `arubafi` binary with env isolation.
///
/// Clears all `ARUBAFI_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn arubafi_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("arubafi");
    cmd.env("HOME", "/tmp/arubafi-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/arubafi-cli-test-nonexistent")
        .env_remove("ARUBAFI_PROFILE")
        .env_remove("ARUBAFI_HOST")
        .env_remove("ARUBAFI_USERNAME")
        .env_remove("ARUBAFI_PASSWORD")
        .env_remove("ARUBAFI_API_TOKEN")
        .env_remove("ARUBAFI_PROXY")
        .env_remove("ARUBAFI_INSECURE")
        .env_remove("ARUBAFI_TIMEOUT");
    cmd
}

/// Like [`arubafi_cmd`], with the config directory at `config_home`
/// holding `config_toml`. Linux-only: `directories` places the file
/// under `$XDG_CONFIG_HOME/arubafi`.
#[cfg(target_os = "linux")]
fn arubafi_cmd_with_config(config_home: &std::path::Path, config_toml: &str) -> assert_cmd::Command {
    let dir = config_home.join("arubafi");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), config_toml).unwrap();

    let mut cmd = arubafi_cmd();
    cmd.env("HOME", config_home).env("XDG_CONFIG_HOME", config_home);
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = arubafi_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    arubafi_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Aruba")
            .and(predicate::str::contains("mm"))
            .and(predicate::str::contains("airwave"))
            .and(predicate::str::contains("central")),
    );
}

#[test]
fn test_version_flag() {
    arubafi_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("arubafi"));
}

#[test]
fn test_mm_help_lists_subcommands() {
    arubafi_cmd().args(["mm", "--help"]).assert().success().stdout(
        predicate::str::contains("get")
            .and(predicate::str::contains("post"))
            .and(predicate::str::contains("write-mem")),
    );
}

// ── Argument errors ─────────────────────────────────────────────────

#[test]
fn test_unknown_table_is_rejected() {
    arubafi_cmd()
        .args(["airwave", "table", "switches"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_op_requires_name() {
    arubafi_cmd()
        .args(["mm", "get", "ap_group", "--op", "in"])
        .assert()
        .code(2);
}

#[test]
fn test_bad_param_syntax() {
    arubafi_cmd()
        .args(["central", "get", "monitoring/v2/aps", "--param", "novalue"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("key=value"));
}

// ── Runtime errors ──────────────────────────────────────────────────

#[test]
fn test_unknown_profile() {
    let output = arubafi_cmd()
        .args(["--profile", "nope", "mm", "write-mem"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    let text = combined_output(&output);
    assert!(text.contains("nope"), "Expected profile name in output:\n{text}");
}

#[test]
fn test_missing_host_without_terminal() {
    // stdin is not a terminal under the test harness: nothing is prompted.
    let output = arubafi_cmd()
        .args(["central", "get", "monitoring/v2/aps"])
        .write_stdin("")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("Central URL or IP required"),
        "Expected host prompt refusal in output:\n{text}"
    );
}

#[cfg(target_os = "linux")]
#[test]
fn test_malformed_config_is_reported() {
    let home = tempfile::tempdir().unwrap();
    let output = arubafi_cmd_with_config(home.path(), "[profiles.campus\nhost = ")
        .args(["mm", "write-mem"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("config loading failed"), "Expected config error in output:\n{text}");
}

// ── Config subcommand ───────────────────────────────────────────────

#[test]
fn test_config_path() {
    arubafi_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_config_profiles_marks_default() {
    let home = tempfile::tempdir().unwrap();
    let config = r#"
default_profile = "campus"

[profiles.campus]
backend = "mobility"
host = "mm.example.net"

[profiles.amp]
backend = "airwave"
host = "amp.example.net"
"#;
    arubafi_cmd_with_config(home.path(), config)
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("amp\tairwave\tamp.example.net\n")
                .and(predicate::str::contains("campus\tmobility\tmm.example.net *")),
        );
}

#[test]
fn test_config_init_without_terminal() {
    arubafi_cmd()
        .args(["config", "init"])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("needs a terminal"));
}

#[test]
fn test_set_password_unknown_profile() {
    arubafi_cmd()
        .args(["--profile", "nope", "config", "set-password"])
        .assert()
        .code(4);
}
