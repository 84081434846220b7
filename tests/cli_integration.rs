//! CLI integration tests for taskdeps
//!
//! These tests drive the binary end to end: project setup, task and
//! dependency edits, and the derived graph queries.

use std::fs;
use std::path::Path;

use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command instance for the taskdeps binary, isolated from user config
fn taskdeps(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("taskdeps"));
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("TASKDEPS_LOG");
    cmd
}

/// Create a temporary directory and initialize a taskdeps project
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    taskdeps(dir.path()).arg("init").assert().success();
    dir
}

/// Adds a task and returns its generated ID
fn add_task(dir: &Path, list: &str, title: &str, extra: &[&str]) -> String {
    let assert = taskdeps(dir)
        .args(["--format", "json", "task", "add", list, title])
        .args(extra)
        .assert()
        .success();

    let json: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    json["id"].as_str().unwrap().to_string()
}

fn json_output(dir: &Path, args: &[&str]) -> serde_json::Value {
    let assert = taskdeps(dir)
        .args(["--format", "json"])
        .args(args)
        .assert()
        .success();
    serde_json::from_slice(&assert.get_output().stdout).unwrap()
}

fn ids(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();

    taskdeps(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized taskdeps project"));

    assert!(dir.path().join(".taskdeps").is_dir());
    assert!(dir.path().join(".taskdeps/lists").is_dir());
    assert!(dir.path().join(".taskdeps/config.toml").is_file());
    assert!(dir.path().join(".taskdeps/.gitignore").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let dir = setup_project();
    taskdeps(dir.path()).arg("init").assert().success();
}

#[test]
fn test_commands_require_project() {
    let dir = TempDir::new().unwrap();

    taskdeps(dir.path())
        .args(["ready", "backlog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not in a taskdeps project"));
}

#[test]
fn test_invalid_list_id_is_rejected() {
    let dir = setup_project();

    taskdeps(dir.path())
        .args(["task", "list", "Not A Slug"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid list ID"));
}

// =============================================================================
// Task Tests
// =============================================================================

#[test]
fn test_task_add_and_list() {
    let dir = setup_project();
    let id = add_task(dir.path(), "backlog", "Write parser", &[]);

    assert!(id.starts_with("t-"));
    assert!(dir.path().join(".taskdeps/lists/backlog.jsonl").is_file());

    taskdeps(dir.path())
        .args(["task", "list", "backlog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Write parser"))
        .stdout(predicate::str::contains(&id));
}

#[test]
fn test_task_add_rejects_bad_priority() {
    let dir = setup_project();

    taskdeps(dir.path())
        .args(["task", "add", "backlog", "Too urgent", "--priority", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("priority"));
}

#[test]
fn test_task_add_after_unknown_task_fails() {
    let dir = setup_project();

    taskdeps(dir.path())
        .args(["task", "add", "backlog", "Orphan", "--after", "t-0000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Dependency task not found: t-0000000"));

    // Nothing was written
    assert!(!dir.path().join(".taskdeps/lists/backlog.jsonl").exists());
}

#[test]
fn test_task_done_twice_fails() {
    let dir = setup_project();
    let id = add_task(dir.path(), "backlog", "Once", &[]);

    taskdeps(dir.path())
        .args(["task", "done", "backlog", &id])
        .assert()
        .success();

    taskdeps(dir.path())
        .args(["task", "done", "backlog", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("status is completed"));
}

// =============================================================================
// Readiness Tests
// =============================================================================

#[test]
fn test_dependency_workflow() {
    let dir = setup_project();
    let a = add_task(dir.path(), "backlog", "Design", &[]);
    let b = add_task(dir.path(), "backlog", "Build", &["--after", &a]);

    let ready = json_output(dir.path(), &["ready", "backlog"]);
    let ready_ids: Vec<&str> = ready
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ready_ids, vec![a.as_str()]);

    taskdeps(dir.path())
        .args(["blocked", "backlog"])
        .assert()
        .success()
        .stdout(predicate::str::contains(&b))
        .stdout(predicate::str::contains(&a));

    taskdeps(dir.path())
        .args(["task", "done", "backlog", &a])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("unblocked: {}", b)));

    let ready = json_output(dir.path(), &["ready", "backlog"]);
    assert_eq!(ready[0]["id"], b.as_str());
}

#[test]
fn test_ready_sorts_by_priority_and_limits() {
    let dir = setup_project();
    add_task(dir.path(), "backlog", "Low", &["--priority", "1"]);
    let high = add_task(dir.path(), "backlog", "High", &["--priority", "5"]);
    add_task(dir.path(), "backlog", "Normal", &[]);

    let ready = json_output(dir.path(), &["ready", "backlog", "--limit", "1"]);
    let ready = ready.as_array().unwrap();

    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0]["id"], high.as_str());
}

#[test]
fn test_why_explains_block() {
    let dir = setup_project();
    let a = add_task(dir.path(), "backlog", "Design", &[]);
    let b = add_task(dir.path(), "backlog", "Build", &["--after", &a]);

    taskdeps(dir.path())
        .args(["why", "backlog", &b])
        .assert()
        .success()
        .stdout(predicate::str::contains("is waiting on"))
        .stdout(predicate::str::contains("Design"));

    taskdeps(dir.path())
        .args(["why", "backlog", &a])
        .assert()
        .success()
        .stdout(predicate::str::contains("is ready to work on"));
}

#[test]
fn test_hand_edited_loops_are_explained() {
    let dir = setup_project();
    fs::write(
        dir.path().join(".taskdeps/lists/backlog.jsonl"),
        concat!(
            r#"{"id":"a","title":"A","dependencies":["a"],"created_at":"2024-01-01T00:00:00Z"}"#,
            "\n",
            r#"{"id":"b","title":"B","dependencies":["c"],"created_at":"2024-01-01T00:00:00Z"}"#,
            "\n",
            r#"{"id":"c","title":"C","dependencies":["b"],"created_at":"2024-01-01T00:00:00Z"}"#,
            "\n",
        ),
    )
    .unwrap();

    taskdeps(dir.path())
        .args(["graph", "backlog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 circular dependency loop(s)"));

    taskdeps(dir.path())
        .args(["why", "backlog", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a depends on itself"));

    taskdeps(dir.path())
        .args(["why", "backlog", "b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Circular dependency: b -> c -> b"));
}

#[test]
fn test_dangling_dependency_is_reported_separately() {
    let dir = setup_project();
    fs::write(
        dir.path().join(".taskdeps/lists/backlog.jsonl"),
        concat!(
            r#"{"id":"a","title":"A","created_at":"2024-01-01T00:00:00Z"}"#,
            "\n",
            r#"{"id":"b","title":"B","dependencies":["a","ghost"],"created_at":"2024-01-01T00:00:00Z"}"#,
            "\n",
        ),
    )
    .unwrap();

    let why = json_output(dir.path(), &["why", "backlog", "b"]);
    assert_eq!(ids(&why["blockedBy"]), vec!["a"]);
    assert_eq!(ids(&why["missingDependencies"]), vec!["ghost"]);
    assert_eq!(why["isReady"], false);

    taskdeps(dir.path())
        .args(["graph", "backlog"])
        .assert()
        .success()
        .stderr(predicate::str::contains("missing task(s): ghost"));
}

// =============================================================================
// Dependency Edit Tests
// =============================================================================

#[test]
fn test_deps_set_rejects_cycle() {
    let dir = setup_project();
    let a = add_task(dir.path(), "backlog", "A", &[]);
    let b = add_task(dir.path(), "backlog", "B", &["--after", &a]);

    let list_path = dir.path().join(".taskdeps/lists/backlog.jsonl");
    let before = fs::read_to_string(&list_path).unwrap();

    taskdeps(dir.path())
        .args(["deps", "set", "backlog", &a, &b])
        .assert()
        .failure()
        .stderr(predicate::str::contains(format!(
            "Circular dependency: {a} -> {b} -> {a}"
        )));

    assert_eq!(fs::read_to_string(&list_path).unwrap(), before);
}

#[test]
fn test_deps_set_rejects_self_dependency() {
    let dir = setup_project();
    let a = add_task(dir.path(), "backlog", "A", &[]);

    taskdeps(dir.path())
        .args(["deps", "set", "backlog", &a, &a])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot depend on itself"));
}

#[test]
fn test_deps_set_dedupes_with_warning() {
    let dir = setup_project();
    let a = add_task(dir.path(), "backlog", "A", &[]);
    let b = add_task(dir.path(), "backlog", "B", &[]);

    taskdeps(dir.path())
        .args(["deps", "set", "backlog", &b, &a, &a])
        .assert()
        .success()
        .stderr(predicate::str::contains("listed more than once"));

    let tasks = json_output(dir.path(), &["task", "list", "backlog"]);
    let b_task = tasks
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["id"] == b.as_str())
        .unwrap();
    assert_eq!(ids(&b_task["dependencies"]), vec![a]);
}

#[test]
fn test_deps_check_reports_without_writing() {
    let dir = setup_project();
    let a = add_task(dir.path(), "backlog", "A", &[]);

    let assert = taskdeps(dir.path())
        .args(["--format", "json", "deps", "check", "backlog", &a, "t-missing"])
        .assert()
        .failure();

    let result: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(result["isValid"], false);
    assert_eq!(result["errors"][0]["code"], "unknown_task");

    // A task that does not exist yet can still be checked
    taskdeps(dir.path())
        .args(["deps", "check", "backlog", "t-future", &a])
        .assert()
        .success()
        .stdout(predicate::str::contains("are valid"));
}

// =============================================================================
// Graph Tests
// =============================================================================

#[test]
fn test_graph_json_report() {
    let dir = setup_project();
    let a = add_task(dir.path(), "backlog", "A", &[]);
    let b = add_task(dir.path(), "backlog", "B", &["--after", &a]);

    let graph = json_output(dir.path(), &["graph", "backlog"]);
    assert_eq!(ids(&graph["roots"]), vec![a.clone()]);
    assert_eq!(ids(&graph["leaves"]), vec![b.clone()]);
    assert_eq!(ids(&graph["readyItems"]), vec![a.clone()]);
    assert_eq!(ids(&graph["blockedItems"]), vec![b.clone()]);
    assert_eq!(ids(&graph["executionOrder"]), vec![a.clone(), b.clone()]);
    assert_eq!(graph["nodes"][1]["depth"], 1);
    assert_eq!(ids(&graph["nodes"][1]["blockedBy"]), vec![a.clone()]);

    // Cached graph is dropped after a write
    taskdeps(dir.path())
        .args(["task", "done", "backlog", &a])
        .assert()
        .success();
    let graph = json_output(dir.path(), &["graph", "backlog"]);
    assert_eq!(ids(&graph["readyItems"]), vec![b]);
}

#[test]
fn test_graph_from_yaml_snapshot_with_cycle() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("tasks.yaml");
    fs::write(
        &snapshot,
        r#"
- id: a
  dependencies: [c]
- id: b
  dependencies: [a]
- id: c
  dependencies: [b]
- id: d
"#,
    )
    .unwrap();

    let assert = taskdeps(dir.path())
        .args(["--format", "json", "graph", "--file"])
        .arg(&snapshot)
        .assert()
        .success()
        .stderr(predicate::str::contains("Circular dependency"));

    let graph: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(graph["cycles"].as_array().unwrap().len(), 1);
    assert_eq!(ids(&graph["readyItems"]), vec!["d"]);
    assert_eq!(ids(&graph["blockedItems"]), vec!["a", "b", "c"]);
}

#[test]
fn test_graph_snapshot_rejects_duplicate_ids() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("tasks.json");
    fs::write(&snapshot, r#"[{"id": "a"}, {"id": "a"}]"#).unwrap();

    taskdeps(dir.path())
        .args(["graph", "--file"])
        .arg(&snapshot)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Duplicate task ID"));
}

// =============================================================================
// Cache Tests
// =============================================================================

#[test]
fn test_cache_clear_and_status() {
    let dir = setup_project();
    add_task(dir.path(), "backlog", "A", &[]);
    taskdeps(dir.path()).args(["graph", "backlog"]).assert().success();

    let status = json_output(dir.path(), &["cache", "status"]);
    assert_eq!(ids(&status["cached"]), vec!["backlog"]);
    assert_eq!(ids(&status["fresh"]), vec!["backlog"]);

    taskdeps(dir.path())
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 1 cached graph(s)"));

    let status = json_output(dir.path(), &["cache", "status"]);
    assert!(status["cached"].as_array().unwrap().is_empty());
}
