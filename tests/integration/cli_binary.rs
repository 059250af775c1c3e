//! End-to-end runs of the node-attrs binary.
//!
//! Each test works in its own temp directory with HOME pointed inside it, so
//! no user configuration leaks in.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn write_json(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_node-attrs"))
        .current_dir(dir)
        .env("HOME", dir.join("home"))
        .env_remove("NODE_ATTRS_LOG")
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_merge_prints_merged_value() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    let defaults = write_json(dir, "defaults.json", r#"{"nginx": {"port": 80, "ports": [80]}}"#);
    let role = write_json(
        dir,
        "role.json",
        r#"{"name": "web", "default_attributes": {"nginx": {"ports": [443]}}, "override_attributes": {"nginx": {"port": 8080}}}"#,
    );

    let output = run(
        dir,
        &[
            "merge",
            "--layer",
            &format!("default={}", defaults),
            "--role",
            &role,
            "/nginx",
        ],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let merged: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(merged, serde_json::json!({"port": 8080, "ports": [80, 443]}));
}

#[test]
fn test_trace_reports_json_log() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    let facts = write_json(dir, "facts.json", r#"{"platform": "ubuntu"}"#);

    let output = run(dir, &["trace", "--facts", &facts, "--format", "json", "/platform"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let log: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(log["/platform"][0]["mechanism"], "external_facts");
    assert_eq!(log["/platform"][0]["rank"], "automatic");
}

#[test]
fn test_missing_attribute_exits_nonzero() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(temp_dir.path(), &["merge", "/absent"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("/absent"));
}

#[test]
fn test_file_logging_writes_configured_file() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();

    let output = run(
        dir,
        &["--log-output", "file", "--log-level", "info", "debug", "/a"],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let log_file = dir.join("node-attrs.log");
    assert!(log_file.exists(), "log file should exist at {:?}", log_file);
    let contents = fs::read_to_string(&log_file).unwrap();
    assert!(contents.contains("node-attrs starting"));
}
