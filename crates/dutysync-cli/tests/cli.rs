use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ROTATION: &str = r#"
name: platform-primary
time_zone: UTC
layers:
  - participants: [A, B]
    rotation_length: 7d
    anchor: "2026-01-05T00:00:00Z"
overrides:
  - participant: C
    start: "2026-01-15T00:00:00Z"
    end: "2026-01-17T00:00:00Z"
"#;

const FROM: &str = "2026-01-05T00:00:00Z";

fn dutysync() -> Command {
    Command::cargo_bin("dutysync").unwrap()
}

fn write_doc(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("rotation.yaml");
    fs::write(&path, body).unwrap();
    path
}

fn reconcile_cmd(doc: &Path, state: &Path) -> Command {
    let mut cmd = dutysync();
    cmd.arg("reconcile")
        .arg(doc)
        .args(["--schedule", "P123", "--state"])
        .arg(state)
        .args(["--from", FROM, "--days", "21"]);
    cmd
}

// ── validate ────────────────────────────────────────────────────────────────

#[test]
fn validate_prints_summary() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(&dir, ROTATION);
    dutysync()
        .arg("validate")
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "platform-primary: valid (1 layers, 1 overrides, time zone UTC)",
        ))
        .stdout(predicate::str::contains("participants:").and(predicate::str::contains("C")));
}

#[test]
fn validate_json_summary() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(&dir, ROTATION);
    let output = dutysync()
        .args(["validate", "--format", "json"])
        .arg(&doc)
        .output()
        .unwrap();
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["name"], "platform-primary");
    assert_eq!(summary["layers"], 1);
    assert_eq!(summary["overrides"], 1);
}

#[test]
fn validate_reports_field_path_of_malformed_layer() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(
        &dir,
        "name: broken\ntime_zone: UTC\nlayers:\n  - participants: []\n    rotation_length: 7d\n",
    );
    dutysync()
        .arg("validate")
        .arg(&doc)
        .assert()
        .failure()
        .stderr(predicate::str::contains("layers[0].participants"));
}

#[test]
fn validate_missing_document_fails() {
    let dir = TempDir::new().unwrap();
    dutysync()
        .arg("validate")
        .arg(dir.path().join("nope.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

// ── expand ──────────────────────────────────────────────────────────────────

#[test]
fn expand_text_lists_intervals_and_totals() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(&dir, ROTATION);
    dutysync()
        .arg("expand")
        .arg(&doc)
        .args(["--from", FROM, "--days", "21"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "2026-01-15T00:00:00+00:00  2026-01-17T00:00:00+00:00  C",
        ))
        .stdout(predicate::str::contains("on-call totals:"))
        .stdout(predicate::str::is_match(r"(?m)^\s+A\s+2w$").unwrap())
        .stdout(predicate::str::is_match(r"(?m)^\s+B\s+5d$").unwrap());
}

#[test]
fn expand_json_with_explicit_end() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(&dir, ROTATION);
    let output = dutysync()
        .arg("expand")
        .arg(&doc)
        .args(["--from", FROM, "--to", "2026-01-26T00:00:00Z", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let intervals: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    let assignees: Vec<&str> = intervals
        .iter()
        .map(|iv| iv["assignee"].as_str().unwrap())
        .collect();
    assert_eq!(assignees, ["A", "B", "C", "B", "A"]);
}

#[test]
fn expand_requires_an_end() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(&dir, ROTATION);
    dutysync()
        .arg("expand")
        .arg(&doc)
        .args(["--from", FROM])
        .assert()
        .failure();
}

#[test]
fn expand_rejects_to_with_days() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(&dir, ROTATION);
    dutysync()
        .arg("expand")
        .arg(&doc)
        .args(["--from", FROM, "--to", "2026-01-26T00:00:00Z", "--days", "3"])
        .assert()
        .failure();
}

#[test]
fn expand_rejects_empty_window() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(&dir, ROTATION);
    dutysync()
        .arg("expand")
        .arg(&doc)
        .args(["--from", FROM, "--to", FROM])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid window"));
}

// ── reconcile ───────────────────────────────────────────────────────────────

#[test]
fn reconcile_populates_state_then_is_in_sync() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(&dir, ROTATION);
    let state = dir.path().join("state.json");

    reconcile_cmd(&doc, &state)
        .assert()
        .success()
        .stdout(predicate::str::contains("5 applied, 0 failed"));

    let stored: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&state).unwrap()).unwrap();
    assert_eq!(stored["schedules"]["P123"].as_array().unwrap().len(), 5);

    reconcile_cmd(&doc, &state)
        .assert()
        .success()
        .stdout(predicate::str::contains("already in sync"));
}

#[test]
fn reconcile_dry_run_does_not_write_state() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(&dir, ROTATION);
    let state = dir.path().join("state.json");

    reconcile_cmd(&doc, &state)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "dry run: 5 create, 0 update, 0 delete would be applied",
        ));
    assert!(!state.exists());
}

#[test]
fn reconcile_after_override_change_updates_in_place() {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("state.json");

    let plain = ROTATION.split("overrides:").next().unwrap();
    let doc = write_doc(&dir, plain);
    reconcile_cmd(&doc, &state).assert().success();

    let doc = write_doc(&dir, ROTATION);
    let output = reconcile_cmd(&doc, &state)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let outcome: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = outcome["report"]["records"].as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r["outcome"]["status"] == "applied"));
    assert!(records.iter().any(|r| r["op"]["op"] == "update"));
}

#[test]
fn reconcile_with_corrupt_state_fails() {
    let dir = TempDir::new().unwrap();
    let doc = write_doc(&dir, ROTATION);
    let state = dir.path().join("state.json");
    fs::write(&state, "{ not json").unwrap();

    reconcile_cmd(&doc, &state)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse state file"));
}
