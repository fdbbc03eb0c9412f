//! Integration tests for core CLI contract behavior.

use {predicates::prelude::*, std::fs, tempfile::tempdir};

/// Port path that never exists, so any attempt to open it fails.
const MISSING_PORT: &str = "/dev/smsups-test-missing-port";

fn cli_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("smsups");
    for var in [
        "SMSUPS_PORT",
        "SMSUPS_BAUD",
        "SMSUPS_TIMEOUT",
        "SMSUPS_INTERVAL",
        "SMSUPS_NON_INTERACTIVE",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_exits_zero_and_writes_stdout_only() {
    cli_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("smsups"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn version_exits_zero_and_writes_stdout_only() {
    cli_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("smsups"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn subcommand_help_lists_bridge_options() {
    cli_cmd()
        .args(["bridge", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--mqtt-host"))
        .stdout(predicate::str::contains("--topic-base"));
}

#[test]
fn commands_lists_registry() {
    cli_cmd()
        .arg("commands")
        .assert()
        .success()
        .stdout(predicate::str::contains("T1"))
        .stdout(predicate::str::contains("Toggle beep"))
        .stdout(predicate::str::contains("51ffffffffb30d"));
}

#[test]
fn commands_json_is_valid() {
    let output = cli_cmd()
        .args(["commands", "--json"])
        .output()
        .expect("command should execute");
    assert!(output.status.success());

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    let entries = parsed.as_array().expect("JSON array");
    assert_eq!(entries.len(), 14);
    assert_eq!(entries[0]["key"], "Q");
    assert_eq!(entries[0]["frame"], "51ffffffffb30d");
    let restore = entries.iter().find(|e| e["key"] == "R").expect("R entry");
    assert_eq!(restore["dangerous"], true);
    assert_eq!(restore["params"], "00c8270f");
}

#[test]
fn list_ports_json_returns_valid_json() {
    let output = cli_cmd()
        .args(["list-ports", "--json"])
        .output()
        .expect("command should execute");
    assert!(output.status.success());

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert!(parsed.is_array());
}

#[test]
fn completions_bash_exits_zero() {
    cli_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("smsups"));
}

// ============================================================================
// Exit Code Tests
// ============================================================================

#[test]
fn exit_code_two_for_unknown_subcommand() {
    cli_cmd()
        .arg("unknown-command-xyz")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn exit_code_two_for_invalid_flag() {
    cli_cmd()
        .arg("--invalid-flag-xyz")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn send_unknown_key_is_usage_error_without_opening_port() {
    // A port that cannot be opened would fail with code 1; code 2 proves
    // the key was rejected first.
    cli_cmd()
        .args(["-p", MISSING_PORT, "send", "XYZ"])
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Unknown command"));
}

#[test]
fn send_dangerous_without_yes_in_non_interactive_mode_is_usage_error() {
    cli_cmd()
        .args(["-p", MISSING_PORT, "--non-interactive", "send", "R"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn hex_invalid_frame_is_usage_error() {
    cli_cmd()
        .args(["-p", MISSING_PORT, "hex", "5"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn query_missing_port_fails_with_generic_error() {
    cli_cmd()
        .args(["-p", MISSING_PORT, "query"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(MISSING_PORT));
}

#[test]
fn invalid_config_file_warns_and_continues() {
    let dir = tempdir().expect("tempdir should be created");
    let config = dir.path().join("smsups.toml");
    fs::write(&config, "invalid toml [[[").expect("write invalid config");

    let output = cli_cmd()
        .current_dir(dir.path())
        .arg("commands")
        .output()
        .expect("command should execute");
    assert!(output.status.success(), "command should succeed despite config warning");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("TOML"), "should warn about invalid TOML");
}

#[test]
fn config_file_port_is_used() {
    let dir = tempdir().expect("tempdir should be created");
    let config = dir.path().join("custom.toml");
    fs::write(&config, format!("[serial]\nport = \"{MISSING_PORT}\"\n")).expect("write config");

    cli_cmd()
        .arg("--config")
        .arg(&config)
        .arg("query")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(MISSING_PORT));
}

#[test]
fn bridge_rejects_invalid_config_interval_with_code_three() {
    let dir = tempdir().expect("tempdir should be created");
    let config = dir.path().join("bridge.toml");
    fs::write(&config, "[bridge]\ninterval_secs = 0.0\n").expect("write config");

    cli_cmd()
        .arg("--config")
        .arg(&config)
        .args(["-p", MISSING_PORT, "bridge"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("interval_secs"));
}
