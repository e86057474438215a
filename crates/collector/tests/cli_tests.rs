//! CLI integration tests

use std::io::Write;
use std::process::Command;

fn collector(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "prp-collector", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = collector(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("PRP/ENS telemetry collector"), "Should show about text");
    assert!(stdout.contains("collect"), "Should show collect command");
    assert!(stdout.contains("test"), "Should show test command");
    assert!(stdout.contains("definition"), "Should show definition command");
    assert!(stdout.contains("--metrics-out"), "Should show metrics flag");
}

#[test]
fn test_collect_help() {
    let output = collector(&["collect", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--output"));
    assert!(stdout.contains("--format"));
}

#[test]
fn test_definition_prints_object_types() {
    let output = collector(&["definition"]);
    assert!(output.status.success(), "definition should succeed");

    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("definition should be JSON");
    let kinds: Vec<&str> = value["object_types"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["key"].as_str())
        .collect();
    assert_eq!(kinds, vec!["switch", "port", "vdan", "lan", "node"]);
}

#[test]
fn test_collect_with_empty_snapshot_fails() {
    let mut snapshot = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(snapshot, r#"{{"hosts": []}}"#).unwrap();

    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "prp-collector", "--", "collect"])
        .env("PRP_INVENTORY__SNAPSHOT_PATH", snapshot.path())
        .env("PRP_INVENTORY__ADAPTER_INSTANCE_ID", "ai-test")
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success(), "no hosts must fail the pass");
    assert!(stderr.contains("no hosts"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(config, "[collection]\nmax_parallel_hosts = 0").unwrap();

    let output = collector(&["--config", config.path().to_str().unwrap(), "collect"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("max_parallel_hosts"), "stderr: {}", stderr);
}
