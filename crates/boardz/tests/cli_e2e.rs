#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ENV_VARS: [&str; 5] = [
    "BOARDZ_BACKEND",
    "BOARDZ_API_URL",
    "BOARDZ_API_TOKEN",
    "BOARDZ_DATA_DIR",
    "BOARDZ_CACHE",
];

/// A boardz command isolated to `data_dir`, with no config file.
fn boardz(data_dir: &Path, backend: &str) -> Command {
    let mut cmd = Command::new(cargo_bin("boardz"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("BOARDZ_DATA_DIR", data_dir)
        .env("BOARDZ_BACKEND", backend)
        .env("NO_COLOR", "1")
        .args(["--config", data_dir.join("none.toml").to_str().unwrap()]);
    cmd
}

fn seed(dir: &Path, backend: &str) {
    boardz(dir, backend)
        .args(["board", "add", "Work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created board 1. Work"));
    for column in ["Todo", "Done"] {
        boardz(dir, backend)
            .args(["column", "add", "1", column])
            .assert()
            .success();
    }
    for title in ["Write docs", "Fix bug"] {
        boardz(dir, backend)
            .args(["task", "add", "-c", "1.1", title])
            .assert()
            .success();
    }
}

#[test]
fn test_naked_run_lists_boards() {
    let temp = TempDir::new().unwrap();
    boardz(temp.path(), "local")
        .assert()
        .success()
        .stdout(predicate::str::contains("No boards yet"));
}

#[test]
fn test_task_workflow_on_both_local_backends() {
    for backend in ["local", "indexed"] {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        seed(dir, backend);

        boardz(dir, backend)
            .args(["task", "add", "--under", "1.1.1", "Outline"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Added 1.1.1.1 Outline"));
        boardz(dir, backend)
            .args(["task", "done", "1.1.1.1"])
            .assert()
            .success();
        boardz(dir, backend)
            .args(["task", "mv", "1.1.2", "--to", "1.2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Moved Fix bug to 1.2.1"));

        boardz(dir, backend)
            .args(["tasks", "1.1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("1.1.1 [ ] Write docs"))
            .stdout(predicate::str::contains("1.1.1.1 [x] Outline"))
            .stdout(predicate::str::contains("Fix bug").not());

        boardz(dir, backend)
            .args(["boards"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Work"))
            .stdout(predicate::str::contains("1/3"));
    }
}

#[test]
fn test_data_files_land_in_data_dir() {
    let temp = TempDir::new().unwrap();
    seed(temp.path(), "local");
    assert!(temp.path().join("boardz-data.json").exists());

    let indexed = TempDir::new().unwrap();
    seed(indexed.path(), "indexed");
    assert!(indexed.path().join("boardz.db").exists());
}

#[test]
fn test_export_then_import_into_other_backend() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    seed(dir, "local");
    let export = dir.join("export.json");

    boardz(dir, "local")
        .args(["export", export.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 boards"));
    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&export).unwrap()).unwrap();
    assert_eq!(doc["boards"][0]["columns"][0]["tasks"][1]["title"], "Fix bug");

    // The indexed backend starts empty: switching never migrates.
    boardz(dir, "indexed")
        .args(["boards"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No boards yet"));
    boardz(dir, "indexed")
        .args(["import", export.to_str().unwrap()])
        .assert()
        .success();
    boardz(dir, "indexed")
        .args(["tasks", "1.1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.1.2 [ ] Fix bug"));
}

#[test]
fn test_select_board_and_settings() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    seed(dir, "local");
    boardz(dir, "local")
        .args(["board", "add", "Home"])
        .assert()
        .success();

    boardz(dir, "local")
        .args(["board", "select", "2"])
        .assert()
        .success();
    boardz(dir, "local")
        .args(["settings", "--calendar", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Home"))
        .stdout(predicate::str::contains("calendar"));

    boardz(dir, "local")
        .args(["board", "rm", "2"])
        .assert()
        .success();
    boardz(dir, "local")
        .args(["settings"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Work"));
}

#[test]
fn test_errors_exit_with_one() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    seed(dir, "local");

    boardz(dir, "local")
        .args(["task", "show", "1.1.9"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no task at position 9"));
    boardz(dir, "local")
        .args(["board", "add", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation"));
    boardz(dir, "server")
        .args(["boards"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("apiUrl"));
}

#[test]
fn test_due_lists_tasks_in_range() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    seed(dir, "local");
    boardz(dir, "local")
        .args(["task", "add", "-c", "1.2", "--deadline", "2026-03-14", "Taxes"])
        .assert()
        .success();

    boardz(dir, "local")
        .args(["due", "2026-03-01", "2026-04-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("due 2026-03-14 00:00"))
        .stdout(predicate::str::contains("Taxes"));
    boardz(dir, "local")
        .args(["due", "2026-04-01", "2026-05-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing due."));
}
