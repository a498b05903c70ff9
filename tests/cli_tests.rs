use std::path::{Path, PathBuf};

use assert_cmd::Command;
use rowfs::{Record, SqliteRowStore, schema::TableLayout};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_cli_exits_with_success_on_help() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rowfs"));
    cmd.arg("--help");
    cmd.assert().success();
}

#[test]
fn test_cli_without_mountpoint_is_usage_error() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rowfs"));
    cmd.assert().failure().code(2);
}

#[test]
fn test_cli_list_prints_tree() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(&dir, "web_widget");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rowfs"));
    cmd.args(["--config", config.to_str().unwrap(), "--list", "/mnt/rows"]);
    let output = cmd.output().expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "d 3",
            "d 3/templates",
            "f 3/templates/header",
            "f 3/templates/footer",
            "d 5",
            "f 5/index",
        ]
    );
}

#[test]
fn test_cli_list_does_not_need_mountpoint() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(&dir, "web_widget");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rowfs"));
    cmd.args(["--config", config.to_str().unwrap(), "--list"]);
    let output = cmd.output().expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.lines().any(|line| line == "f 5/index"), "stdout: {stdout}");
}

#[test]
fn test_cli_mount_without_mountpoint_is_usage_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(&dir, "web_widget");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rowfs"));
    cmd.args(["--config", config.to_str().unwrap()]);
    cmd.assert().failure().code(2);
}

#[test]
fn test_cli_unknown_profile_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(&dir, "web_widget");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rowfs"));
    cmd.args([
        "--config",
        config.to_str().unwrap(),
        "--profile",
        "prod",
        "--list",
        "/mnt/rows",
    ]);
    cmd.assert().failure().code(1);
}

#[test]
fn test_cli_missing_table_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(&dir, "missing_table");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rowfs"));
    cmd.args(["--config", config.to_str().unwrap(), "--list", "/mnt/rows"]);
    let output = cmd.output().expect("run");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("connection error"), "stderr: {stderr}");
}

fn write_config(dir: &TempDir, table: &str) -> PathBuf {
    let database = dir.path().join("rows.db");
    seed(&database);
    let config = json!({
        "default_database": {
            "name": "test",
            "database": database.to_str().unwrap(),
            "table": table
        },
        "logging": { "enabled": false }
    });
    let path = dir.path().join("rowfs.json");
    std::fs::write(&path, config.to_string()).expect("write config");
    path
}

fn seed(path: &Path) {
    let store = SqliteRowStore::create(path, TableLayout::default()).expect("create");
    for record in [
        Record::new(1, 3, "templates/header").with_content("<h1>"),
        Record::new(2, 5, "index").with_content("home"),
        Record::new(3, 3, "templates/footer").with_content("</h1>"),
    ] {
        store.insert_record(&record).expect("insert");
    }
}
