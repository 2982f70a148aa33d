use std::process::{Command, Output};
use tempfile::TempDir;

fn run(dir: &TempDir, args: &[&str]) -> Output {
    let exe = env!("CARGO_BIN_EXE_sprintboard");
    Command::new(exe)
        .args(args)
        .env("SPRINTBOARD_STORE_PATH", dir.path().join("store.json"))
        .env("SPRINTBOARD_CONFIG_PATH", dir.path().join("config.json"))
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run sprintboard")
}

fn add_json(dir: &TempDir, args: &[&str]) -> serde_json::Value {
    let mut argv = vec!["--json", "add"];
    argv.extend_from_slice(args);
    let output = run(dir, &argv);
    assert!(
        output.status.success(),
        "add failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json output")
}

fn stored(dir: &TempDir) -> serde_json::Value {
    let content = std::fs::read_to_string(dir.path().join("store.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[test]
fn add_persists_task_with_fields() {
    let dir = TempDir::new().unwrap();

    let task = add_json(
        &dir,
        &["Write release notes", "--hours", "2.5", "--desc", "  for 1.2 ", "--status", "working"],
    );

    assert_eq!(task["subject"], "Write release notes");
    assert_eq!(task["status"], "working");
    assert_eq!(task["estimated_hour"], 2.5);
    assert_eq!(task["description"], "for 1.2");

    let store = stored(&dir);
    assert_eq!(store["schema_version"], 1);
    assert_eq!(store["tasks"][0]["id"], task["id"]);
}

#[test]
fn add_plain_prints_confirmation() {
    let dir = TempDir::new().unwrap();

    let output = run(&dir, &["add", "Fix login", "--hours", "1"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Added task: Fix login (task-"));
}

#[test]
fn add_rejects_invalid_input_before_writing() {
    let dir = TempDir::new().unwrap();

    let negative = run(&dir, &["add", "Fix login", "--hours", "-2"]);
    assert!(!negative.status.success());
    assert!(String::from_utf8_lossy(&negative.stderr).contains("ERROR: validation_failed"));

    let blank = run(&dir, &["add", "   ", "--hours", "2"]);
    assert!(!blank.status.success());
    assert!(String::from_utf8_lossy(&blank.stderr).contains("subject is required"));

    let status = run(&dir, &["add", "x", "--hours", "2", "--status", "blocked"]);
    assert!(!status.status.success());
    assert!(String::from_utf8_lossy(&status.stderr).contains("unknown status"));

    assert!(!dir.path().join("store.json").exists());
}

#[test]
fn add_rejects_grandchild() {
    let dir = TempDir::new().unwrap();
    let parent = add_json(&dir, &["parent", "--hours", "1"]);
    let parent_id = parent["id"].as_str().unwrap();
    let child = add_json(&dir, &["child", "--hours", "1", "--parent", parent_id]);
    let child_id = child["id"].as_str().unwrap();

    let output = run(&dir, &["add", "grandchild", "--hours", "1", "--parent", child_id]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: validation_failed"));
    assert!(stderr.contains("is itself a subtask"));
}

#[test]
fn edit_updates_and_clears_fields() {
    let dir = TempDir::new().unwrap();
    let parent = add_json(&dir, &["parent", "--hours", "1"]);
    let parent_id = parent["id"].as_str().unwrap();
    let task = add_json(
        &dir,
        &["child", "--hours", "1", "--desc", "notes", "--parent", parent_id],
    );
    let id = task["id"].as_str().unwrap();

    let output = run(
        &dir,
        &["--json", "edit", id, "--status", "done", "--hours", "3", "--clear-desc", "--clear-parent"],
    );

    assert!(output.status.success());
    let edited: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(edited["status"], "completed");
    assert_eq!(edited["estimated_hour"], 3.0);
    assert!(edited["description"].is_null());
    assert!(edited["parent_task_id"].is_null());
}

#[test]
fn edit_without_fields_is_rejected() {
    let dir = TempDir::new().unwrap();
    let task = add_json(&dir, &["solo", "--hours", "1"]);

    let output = run(&dir, &["edit", task["id"].as_str().unwrap()]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no fields to update"));
}

#[test]
fn delete_removes_task_and_missing_task_fails() {
    let dir = TempDir::new().unwrap();
    let task = add_json(&dir, &["gone soon", "--hours", "1"]);
    let id = task["id"].as_str().unwrap();

    let output = run(&dir, &["delete", id]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("Deleted task: {id}")
    );
    assert!(stored(&dir)["tasks"].as_array().unwrap().is_empty());

    let again = run(&dir, &["delete", id]);
    assert!(!again.status.success());
    assert!(String::from_utf8_lossy(&again.stderr).contains("ERROR: fetch_failed"));
}

#[test]
fn show_prints_details_and_reports_missing() {
    let dir = TempDir::new().unwrap();
    let task = add_json(&dir, &["inspect me", "--hours", "4", "--assignee", "user-7"]);
    let id = task["id"].as_str().unwrap();

    let output = run(&dir, &["show", id]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("subject:     inspect me"));
    assert!(stdout.contains("estimate:    4.0h"));
    assert!(stdout.contains("assignee:    user-7"));

    let missing = run(&dir, &["show", "task-404"]);
    assert!(!missing.status.success());
    assert!(
        String::from_utf8_lossy(&missing.stderr)
            .contains("ERROR: fetch_failed - task not found: task-404")
    );
}

#[test]
fn children_lists_subtasks_of_a_root() {
    let dir = TempDir::new().unwrap();
    let parent = add_json(&dir, &["parent", "--hours", "10"]);
    let parent_id = parent["id"].as_str().unwrap();
    add_json(&dir, &["child a", "--hours", "2", "--parent", parent_id]);
    add_json(&dir, &["child b", "--hours", "3", "--parent", parent_id]);

    let output = run(&dir, &["children", parent_id]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("| total 5.0h"));
    assert!(stdout.contains("  - "));

    let not_root = run(&dir, &["children", "task-404"]);
    assert!(!not_root.status.success());
    assert!(String::from_utf8_lossy(&not_root.stderr).contains("is not a root task"));
}
