mod support;

use predicates::prelude::*;
use tempfile::TempDir;

use support::{json_data, taskflow_cmd};
use taskflow::config::Config;
use taskflow::Error;

#[test]
fn init_writes_default_config_once() {
    let dir = TempDir::new().unwrap();
    let first = json_data(dir.path(), &["init"]);
    assert_eq!(first["created"], true);

    let written = std::fs::read_to_string(dir.path().join("taskflow.toml")).unwrap();
    assert!(written.contains("namespace = \"taskflow\""));
    assert!(written.contains("[achievements]"));

    let second = json_data(dir.path(), &["init"]);
    assert_eq!(second["created"], false);

    let forced = json_data(dir.path(), &["init", "--force"]);
    assert_eq!(forced["created"], true);
}

#[test]
fn status_when_signed_out() {
    let dir = TempDir::new().unwrap();
    json_data(dir.path(), &["task", "add", "Counted"]);
    let status = json_data(dir.path(), &["status"]);
    assert_eq!(status["signed_in"], false);
    assert_eq!(status["state"], "unauthenticated");
    assert_eq!(status["remote_configured"], false);
    assert_eq!(status["tasks"], 1);
    assert!(status.get("last_sync").is_none());
}

#[test]
fn login_without_remote_is_config_error() {
    let dir = TempDir::new().unwrap();
    taskflow_cmd(dir.path())
        .args(["login", "--owner", "alice", "--token", "tok"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("remote store is not configured"));
}

#[test]
fn sync_when_signed_out_is_user_error() {
    let dir = TempDir::new().unwrap();
    taskflow_cmd(dir.path())
        .args(["sync"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Not signed in"))
        .stderr(predicate::str::contains("hint: taskflow login"));
}

#[test]
fn explicit_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "namespace = \"has space\"\n").unwrap();
    taskflow_cmd(dir.path())
        .arg("--config")
        .arg(&path)
        .args(["task", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("namespace"));
}

#[test]
fn implicit_invalid_config_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("taskflow.toml"), "this is not toml = = =").unwrap();
    let status = json_data(dir.path(), &["status"]);
    assert_eq!(status["namespace"], "taskflow");
}

#[test]
fn namespaces_isolate_data() {
    let dir = TempDir::new().unwrap();
    json_data(dir.path(), &["task", "add", "Default space"]);

    let path = dir.path().join("other.toml");
    std::fs::write(&path, "namespace = \"other\"\n").unwrap();
    let output = taskflow_cmd(dir.path())
        .arg("--config")
        .arg(&path)
        .args(["--json", "task", "list"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["data"]["total"], 0);
}

#[test]
fn remote_url_flag_marks_remote_configured() {
    let dir = TempDir::new().unwrap();
    let output = taskflow_cmd(dir.path())
        .args([
            "--remote-url",
            "https://project.example.test",
            "--api-key",
            "anon",
            "--json",
            "status",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["data"]["remote_configured"], true);
}

#[test]
fn config_load_rejects_descending_thresholds() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("taskflow.toml");
    std::fs::write(&path, "[achievements]\nstreak = [7, 3, 14, 30, 60]\n").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
    assert_eq!(Config::load_or_default(&path), Config::default());
}

#[test]
fn config_save_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("taskflow.toml");
    let mut config = Config::default();
    config.remote.url = Some("https://project.example.test".to_string());
    config.remote.api_key = Some("anon".to_string());
    config.remote.timeout_ms = 2_500;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(
        loaded.remote.endpoint(),
        Some(("https://project.example.test", "anon"))
    );
}
