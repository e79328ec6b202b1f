//! Integration tests for the CLI interface

use assert_cmd::Command;
use gridquery::testing::helpers::{write_config, write_json};
use gridquery::testing::orders_json;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;

fn gridquery() -> Command {
    Command::cargo_bin("gridquery").unwrap()
}

fn data_file(dir: &TempDir) -> PathBuf {
    write_json(dir.path(), "orders.json", &Value::Array(orders_json())).unwrap()
}

#[test]
fn test_cli_help() {
    gridquery()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_invalid_command() {
    gridquery()
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_run_prints_envelope() {
    let temp_dir = TempDir::new().unwrap();
    let data = data_file(&temp_dir);
    let request = write_json(
        temp_dir.path(),
        "request.json",
        &json!({
            "where": [{"field": "CustomerID", "operator": "equal", "value": "ALFKI"}],
            "sorted": [{"name": "OrderID", "direction": "descending"}],
            "requiresCounts": true
        }),
    )
    .unwrap();

    let output = gridquery()
        .args(["run", "--data"])
        .arg(&data)
        .arg("--request")
        .arg(&request)
        .output()
        .unwrap();
    assert!(output.status.success());

    let envelope: Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<i64> = envelope["result"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["OrderID"].as_i64())
        .collect();
    assert_eq!(ids, vec![1006, 1001]);
    assert_eq!(envelope["count"], json!(2));
}

#[test]
fn test_run_pretty_output() {
    let temp_dir = TempDir::new().unwrap();
    let data = data_file(&temp_dir);
    let request = write_json(
        temp_dir.path(),
        "request.json",
        &json!({"take": 1, "select": ["OrderID"]}),
    )
    .unwrap();

    gridquery()
        .args(["run", "--pretty", "-d"])
        .arg(&data)
        .arg("-r")
        .arg(&request)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"result\": [\n"))
        .stdout(predicate::str::contains("\"OrderID\": 1001"));
}

#[test]
fn test_run_null_request_is_argument_error() {
    let temp_dir = TempDir::new().unwrap();
    let data = data_file(&temp_dir);
    let request = write_json(temp_dir.path(), "request.json", &Value::Null).unwrap();

    gridquery()
        .args(["run", "-d"])
        .arg(&data)
        .arg("-r")
        .arg(&request)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid argument 'request'"));
}

#[test]
fn test_run_malformed_request_is_request_error() {
    let temp_dir = TempDir::new().unwrap();
    let data = data_file(&temp_dir);
    let request = write_json(
        temp_dir.path(),
        "request.json",
        &json!({"where": [{"field": "OrderID", "operator": "like", "value": 1}]}),
    )
    .unwrap();

    gridquery()
        .args(["run", "-d"])
        .arg(&data)
        .arg("-r")
        .arg(&request)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("like"));
}

#[test]
fn test_run_missing_data_file() {
    let temp_dir = TempDir::new().unwrap();
    let request = write_json(temp_dir.path(), "request.json", &json!({})).unwrap();

    gridquery()
        .args(["run", "-d"])
        .arg(temp_dir.path().join("absent.json"))
        .arg("-r")
        .arg(&request)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_config_file_changes_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let data = data_file(&temp_dir);
    let config = write_config(temp_dir.path(), "default_ignore_case = false\n").unwrap();
    let request = write_json(
        temp_dir.path(),
        "request.json",
        &json!({"where": [{"field": "CustomerID", "operator": "equal", "value": "alfki"}], "requiresCounts": true}),
    )
    .unwrap();

    gridquery()
        .arg("--config")
        .arg(&config)
        .args(["run", "-d"])
        .arg(&data)
        .arg("-r")
        .arg(&request)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\":0"));
}

#[test]
fn test_missing_config_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let request = write_json(temp_dir.path(), "request.json", &json!({})).unwrap();

    gridquery()
        .arg("-c")
        .arg(temp_dir.path().join("absent.toml"))
        .args(["check", "-r"])
        .arg(&request)
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_check_summarizes_request() {
    let temp_dir = TempDir::new().unwrap();
    let request = write_json(
        temp_dir.path(),
        "request.json",
        &json!({
            "where": [{"field": "CustomerID", "operator": "equal", "value": "ALFKI"}],
            "group": ["ShipCountry"],
            "take": 5
        }),
    )
    .unwrap();

    gridquery()
        .args(["check", "--request"])
        .arg(&request)
        .assert()
        .success()
        .stdout(predicate::str::contains("request is valid"))
        .stdout(predicate::str::contains("filter: 1 clause(s) joined by And"))
        .stdout(predicate::str::contains("page: skip 0 take 5"))
        .stdout(predicate::str::contains("group: ShipCountry (paging rows)"));
}

#[test]
fn test_check_empty_request() {
    let temp_dir = TempDir::new().unwrap();
    let request = write_json(temp_dir.path(), "request.json", &json!({})).unwrap();

    gridquery()
        .args(["check", "-r"])
        .arg(&request)
        .assert()
        .success()
        .stdout(predicate::str::contains("returns every record unchanged"));
}

#[test]
fn test_check_rejects_bad_direction() {
    let temp_dir = TempDir::new().unwrap();
    let request = write_json(
        temp_dir.path(),
        "request.json",
        &json!({"sorted": [{"name": "OrderID", "direction": "sideways"}]}),
    )
    .unwrap();

    gridquery()
        .args(["check", "-r"])
        .arg(&request)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("sideways"));
}
