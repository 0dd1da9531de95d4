mod support;

use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

use support::{json_data, taskflow_cmd};

fn add_task(dir: &TempDir, title: &str) -> Value {
    json_data(dir.path(), &["task", "add", title])["task"].clone()
}

fn listed_titles(dir: &TempDir) -> Vec<String> {
    json_data(dir.path(), &["task", "list"])["tasks"]
        .as_array()
        .expect("tasks array")
        .iter()
        .map(|task| task["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

fn listed_orders(dir: &TempDir) -> Vec<u64> {
    json_data(dir.path(), &["task", "list"])["tasks"]
        .as_array()
        .expect("tasks array")
        .iter()
        .map(|task| task["order"].as_u64().expect("order"))
        .collect()
}

#[test]
fn help_lists_command_groups() {
    let dir = TempDir::new().unwrap();
    taskflow_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("task"))
        .stdout(predicate::str::contains("category"))
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("achievements"));

    taskflow_cmd(dir.path())
        .args(["task", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("move"));
}

#[test]
fn add_appends_with_dense_order() {
    let dir = TempDir::new().unwrap();
    let first = add_task(&dir, "Write report");
    let second = add_task(&dir, "Review notes");

    assert_eq!(first["order"], 0);
    assert_eq!(second["order"], 1);
    assert_eq!(first["status"], "pending");
    assert_eq!(first["priority"], "medium");
    assert_eq!(listed_titles(&dir), ["Write report", "Review notes"]);
}

#[test]
fn add_while_signed_out_reports_offline() {
    let dir = TempDir::new().unwrap();
    let data = json_data(dir.path(), &["task", "add", "Local only"]);
    assert_eq!(data["remote"]["status"], "offline");
}

#[test]
fn add_rejects_blank_title() {
    let dir = TempDir::new().unwrap();
    taskflow_cmd(dir.path())
        .args(["task", "add", "   "])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error:"));
    assert!(listed_titles(&dir).is_empty());
}

#[test]
fn add_with_fields_and_show() {
    let dir = TempDir::new().unwrap();
    let task = json_data(
        dir.path(),
        &[
            "task",
            "add",
            "Pay rent",
            "-d",
            "before the 5th",
            "--priority",
            "high",
            "--status",
            "in_progress",
            "--due",
            "2030-01-05T12:00:00Z",
        ],
    )["task"]
        .clone();
    assert_eq!(task["priority"], "high");
    assert_eq!(task["status"], "in_progress");
    assert_eq!(task["description"], "before the 5th");
    assert_eq!(task["dueDate"], "2030-01-05T12:00:00Z");

    let id = task["id"].as_str().unwrap();
    let shown = json_data(dir.path(), &["task", "show", &id[..8]]);
    assert_eq!(shown["id"], id);
    assert_eq!(shown["title"], "Pay rent");
}

#[test]
fn edit_changes_fields_and_clears_due() {
    let dir = TempDir::new().unwrap();
    let task = json_data(
        dir.path(),
        &["task", "add", "Draft", "--due", "2030-02-01T09:00:00Z"],
    )["task"]
        .clone();
    let id = task["id"].as_str().unwrap();

    let edited = json_data(
        dir.path(),
        &["task", "edit", id, "--title", "Final", "--clear-due", "-p", "low"],
    )["task"]
        .clone();
    assert_eq!(edited["title"], "Final");
    assert_eq!(edited["priority"], "low");
    assert!(edited["dueDate"].is_null());
    assert_eq!(edited["order"], task["order"]);
}

#[test]
fn edit_without_fields_is_user_error() {
    let dir = TempDir::new().unwrap();
    let id = add_task(&dir, "Idle")["id"].as_str().unwrap().to_string();
    taskflow_cmd(dir.path())
        .args(["task", "edit", &id])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nothing to change"));
}

#[test]
fn done_marks_completed() {
    let dir = TempDir::new().unwrap();
    let id = add_task(&dir, "Finish")["id"].as_str().unwrap().to_string();
    let data = json_data(dir.path(), &["task", "done", &id]);
    assert_eq!(data["task"]["status"], "completed");

    let completed = json_data(dir.path(), &["task", "list", "--status", "completed"]);
    assert_eq!(completed["total"], 1);
}

#[test]
fn move_reorders_and_keeps_order_dense() {
    let dir = TempDir::new().unwrap();
    add_task(&dir, "a");
    add_task(&dir, "b");
    let c = add_task(&dir, "c");
    add_task(&dir, "d");

    let id = c["id"].as_str().unwrap();
    let moved = json_data(dir.path(), &["task", "move", id, "0"]);
    assert_eq!(moved["moved"], true);
    assert_eq!(moved["index"], 0);

    assert_eq!(listed_titles(&dir), ["c", "a", "b", "d"]);
    assert_eq!(listed_orders(&dir), [0, 1, 2, 3]);
}

#[test]
fn move_to_same_position_is_noop() {
    let dir = TempDir::new().unwrap();
    add_task(&dir, "a");
    let b = add_task(&dir, "b");
    let moved = json_data(dir.path(), &["task", "move", b["id"].as_str().unwrap(), "1"]);
    assert_eq!(moved["moved"], false);
    assert_eq!(listed_titles(&dir), ["a", "b"]);
}

#[test]
fn move_past_end_clamps_to_last() {
    let dir = TempDir::new().unwrap();
    let a = add_task(&dir, "a");
    add_task(&dir, "b");
    add_task(&dir, "c");
    json_data(dir.path(), &["task", "move", a["id"].as_str().unwrap(), "99"]);
    assert_eq!(listed_titles(&dir), ["b", "c", "a"]);
}

#[test]
fn rm_closes_the_gap() {
    let dir = TempDir::new().unwrap();
    add_task(&dir, "a");
    let b = add_task(&dir, "b");
    add_task(&dir, "c");

    let removed = json_data(dir.path(), &["task", "rm", b["id"].as_str().unwrap()]);
    assert_eq!(removed["removed"]["title"], "b");
    assert_eq!(listed_titles(&dir), ["a", "c"]);
    assert_eq!(listed_orders(&dir), [0, 1]);
}

#[test]
fn unknown_task_is_not_found_envelope() {
    let dir = TempDir::new().unwrap();
    let output = taskflow_cmd(dir.path())
        .args(["--json", "task", "show", "missing"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    let envelope: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["command"], "task show");
    assert_eq!(envelope["error"]["kind"], "user_error");
    assert_eq!(envelope["error"]["details"]["kind"], "task");
    assert_eq!(envelope["next_steps"][0], "taskflow task list");
}

#[test]
fn list_filters_and_sorts() {
    let dir = TempDir::new().unwrap();
    json_data(dir.path(), &["task", "add", "Buy milk", "-p", "low"]);
    json_data(dir.path(), &["task", "add", "Fix roof", "-p", "high"]);
    json_data(
        dir.path(),
        &["task", "add", "Call plumber", "-d", "about the roof leak"],
    );

    let roof = json_data(dir.path(), &["task", "list", "--search", "ROOF"]);
    assert_eq!(roof["total"], 2);

    let high = json_data(dir.path(), &["task", "list", "--priority", "high"]);
    assert_eq!(high["tasks"][0]["title"], "Fix roof");

    let by_title = json_data(dir.path(), &["task", "list", "--sort", "title"]);
    let first = by_title["tasks"][0]["title"].clone();
    assert_eq!(first, "Buy milk");

    let by_priority = json_data(dir.path(), &["task", "list", "--sort", "priority"]);
    assert_eq!(by_priority["tasks"][0]["title"], "Fix roof");
    let reversed = json_data(dir.path(), &["task", "list", "--sort", "priority", "--desc"]);
    assert_eq!(reversed["tasks"][0]["title"], "Buy milk");

    // Sorted views never rewrite the stored order
    assert_eq!(listed_orders(&dir), [0, 1, 2]);
}

#[test]
fn unknown_sort_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    taskflow_cmd(dir.path())
        .args(["task", "list", "--sort", "mood"])
        .assert()
        .code(2);
}

#[test]
fn human_output_shows_positions() {
    let dir = TempDir::new().unwrap();
    add_task(&dir, "Water plants");
    taskflow_cmd(dir.path())
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#0 [pending][medium]"))
        .stdout(predicate::str::contains("Water plants"));
}

#[test]
fn quiet_suppresses_human_output() {
    let dir = TempDir::new().unwrap();
    taskflow_cmd(dir.path())
        .args(["--quiet", "task", "add", "Silent"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert_eq!(listed_titles(&dir), ["Silent"]);
}
