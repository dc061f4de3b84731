//! Integration tests for `qernal auth`.
//!
//! These run the binary without a terminal, so the prompt reads from stdin.
//! Hosts point at a closed port; only `--no-verify` logins succeed.

mod common;

use common::TestEnv;
use predicates::prelude::*;

// ===== Login =====

#[test]
fn test_login_from_stdin_writes_config() {
    let env = TestEnv::new();

    env.qernal()
        .args(["auth", "login", "--no-verify"])
        .write_stdin("client-id@client-secret\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved credential"))
        .stdout(predicate::str::contains("client-secret").not());

    assert!(env.read_config().contains("client-id@client-secret"));
}

#[test]
#[cfg(unix)]
fn test_login_config_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let env = TestEnv::new();
    env.qernal()
        .args(["auth", "login", "--no-verify"])
        .write_stdin("client-id@client-secret\n")
        .assert()
        .success();

    let mode = std::fs::metadata(env.config_file())
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_login_creates_missing_config_dir() {
    let env = TestEnv::new();
    let nested = env.config_path().join("fresh");

    env.qernal()
        .env("QERNAL_CONFIG_DIR", &nested)
        .args(["auth", "login", "--no-verify"])
        .write_stdin("a@b\n")
        .assert()
        .success();

    assert!(nested.join("config.yaml").exists());
}

#[test]
fn test_login_invalid_format_fails_and_writes_nothing() {
    let env = TestEnv::new();

    env.qernal()
        .args(["auth", "login", "--no-verify"])
        .write_stdin("idjdkdddd@\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "invalid token format, expected format is clientid@clientsecret",
        ));

    assert!(!env.config_file().exists());
}

#[test]
fn test_login_empty_input_is_rejected() {
    let env = TestEnv::new();

    env.qernal()
        .args(["auth", "login", "--no-verify"])
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("input is required"));

    assert!(!env.config_file().exists());
}

#[test]
fn test_login_eof_is_cancelled() {
    let env = TestEnv::new();

    env.qernal()
        .args(["auth", "login", "--no-verify"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("input cancelled"));
}

#[test]
fn test_login_existing_declined_keeps_token() {
    let env = TestEnv::with_token("old@token");

    env.qernal()
        .args(["auth", "login", "--no-verify"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Found an auth token"));

    assert!(env.read_config().contains("old@token"));
}

#[test]
fn test_login_existing_confirmed_overwrites() {
    let env = TestEnv::with_token("old@token");

    env.qernal()
        .args(["auth", "login", "--no-verify"])
        .write_stdin("y\nnew@token\n")
        .assert()
        .success();

    let config = env.read_config();
    assert!(config.contains("new@token"));
    assert!(!config.contains("old@token"));
}

#[test]
fn test_login_env_token_declined_is_persisted() {
    let env = TestEnv::new();

    env.qernal()
        .env("QERNAL_TOKEN", "env@token")
        .args(["auth", "login", "--no-verify"])
        .write_stdin("n\n")
        .assert()
        .success();

    assert!(env.read_config().contains("env@token"));
}

#[test]
fn test_login_json_output() {
    let env = TestEnv::new();

    let output = env
        .qernal()
        .args(["auth", "login", "--no-verify", "--output", "json"])
        .write_stdin("client-identifier@client-secret\n")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["token"], "clie...cret");
    assert_eq!(json["replaced"], true);
    assert_eq!(json["verified"], false);
}

#[test]
fn test_login_with_verify_unreachable_writes_nothing() {
    let env = TestEnv::new();

    env.qernal()
        .args(["auth", "login"])
        .write_stdin("client@secret\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("HTTP request failed"));

    assert!(!env.config_file().exists());
}

// ===== Check =====

#[test]
fn test_check_invalid_token_argument() {
    let env = TestEnv::new();

    env.qernal()
        .args(["auth", "check", "--token", "missing-separator"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid token format"));
}

#[test]
fn test_check_invalid_env_token() {
    let env = TestEnv::with_token("file@token");

    env.qernal()
        .env("QERNAL_TOKEN", "a@b@c")
        .args(["auth", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid token format"));
}

#[test]
fn test_check_parse_error_is_fatal_without_prompt() {
    let env = TestEnv::new();
    env.write_config("token: [unclosed\n");

    env.qernal()
        .args(["auth", "check"])
        .write_stdin("typed@token\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config file"));
}

#[test]
#[cfg(unix)]
fn test_check_warns_on_loose_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let env = TestEnv::with_token("file@token");
    std::fs::set_permissions(env.config_file(), std::fs::Permissions::from_mode(0o644)).unwrap();

    // The remote check fails (no server), but the warning comes first
    env.qernal()
        .args(["auth", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Warning:"))
        .stderr(predicate::str::contains("chmod 600"));
}

#[test]
fn test_check_json_error_format() {
    let env = TestEnv::new();

    let output = env
        .qernal()
        .args(["auth", "check", "--token", "bad", "-o", "json"])
        .output()
        .unwrap();
    assert!(!output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert!(json["error"].as_str().unwrap().contains("invalid token format"));
}

// ===== Logout =====

#[test]
fn test_logout_removes_config() {
    let env = TestEnv::with_token("file@token");

    env.qernal()
        .args(["auth", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));

    assert!(!env.config_file().exists());
}

#[test]
fn test_logout_without_config_is_noop() {
    let env = TestEnv::new();

    env.qernal()
        .args(["auth", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No stored credential"));
}
