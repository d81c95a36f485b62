//! E2E tests for `fixlag analyze` and `fixlag audit`.
//!
//! Covers: report to stdout and to a file, JSON summaries, bad-lines output,
//! project config defaults, and the fatal error paths.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test harness helpers
// ---------------------------------------------------------------------------

const LOG: &str = "# fixlag snapshot log v1
alpha\tC1\t2024-01-01\t{\"total\":2,\"issues\":[{\"key\":\"K1\",\"issueStatus\":\"OPEN\",\"author\":\"ann\"},{\"key\":\"K3\",\"issueStatus\":\"OPEN\",\"author\":\"ann\",\"severity\":\"MAJOR\"}]}
alpha\tC2\t2024-01-06\t{\"total\":2,\"issues\":[{\"key\":\"K1\",\"issueStatus\":\"FIXED\",\"author\":\"bob\"},{\"key\":\"K3\",\"issueStatus\":\"OPEN\",\"author\":\"ann\"}]}
alpha\tC3\t2024-01-10\t{\"total\":0,\"issues\":[]}
beta\tB1\t2024-02-01\t[{\"key\":\"K3\",\"issueStatus\":\"OPEN\",\"severity\":\"MINOR\"}]
beta\tB2\tnot-a-date\t[]
";

fn fixlag_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fixlag"));
    cmd.current_dir(dir);
    cmd.env("FIXLAG_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd.env_remove("FORMAT");
    cmd
}

fn write_log(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("snapshots.log");
    std::fs::write(&path, LOG).expect("write log");
    path
}

// ---------------------------------------------------------------------------
// fixlag analyze
// ---------------------------------------------------------------------------

#[test]
fn analyze_writes_tsv_report_to_stdout() {
    let dir = TempDir::new().unwrap();
    write_log(dir.path());

    let output = fixlag_cmd(dir.path())
        .args(["analyze", "snapshots.log", "--quiet"])
        .output()
        .expect("analyze should not crash");
    assert!(
        output.status.success(),
        "analyze failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).unwrap();
    let mut lines = stdout.lines();
    let header = lines.next().expect("header row");
    assert!(header.starts_with("key\tsample\tresolution\t"));
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].starts_with("K1\talpha\tfixed\t2024-01-01\tC1\t2024-01-06\tC2\tbob\t"));
    assert!(rows[1].starts_with("K3\talpha\tnext_commit\t"));
    assert!(rows[2].starts_with("K3\tbeta\topen\t"));
}

#[test]
fn analyze_to_file_prints_json_summary() {
    let dir = TempDir::new().unwrap();
    write_log(dir.path());

    let output = fixlag_cmd(dir.path())
        .args(["analyze", "snapshots.log", "--output", "report.tsv", "--json"])
        .output()
        .expect("analyze should not crash");
    assert!(output.status.success());

    let summary: Value = serde_json::from_slice(&output.stdout).expect("valid JSON summary");
    assert_eq!(summary["samples"], 2);
    assert_eq!(summary["snapshots"], 4);
    assert_eq!(summary["rejected_rows"], 1);
    assert_eq!(summary["records"], 3);
    assert_eq!(summary["fixed"], 1);
    assert_eq!(summary["resolved_next_commit"], 1);
    assert_eq!(summary["still_open"], 1);
    assert_eq!(summary["report"], "report.tsv");
    assert_eq!(summary["anomalies"]["malformed_snapshot"], 0);

    let report = std::fs::read_to_string(dir.path().join("report.tsv")).unwrap();
    assert_eq!(report.lines().count(), 4);
}

#[test]
fn analyze_reads_stdin_and_writes_jsonl() {
    let dir = TempDir::new().unwrap();

    let output = fixlag_cmd(dir.path())
        .args(["analyze", "-", "--report-format", "jsonl", "--quiet"])
        .write_stdin(LOG)
        .output()
        .expect("analyze should not crash");
    assert!(output.status.success());

    let rows: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).expect("JSONL row"))
        .collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1]["key"], "K3");
    assert_eq!(rows[1]["next_commit_hash"], "C3");
    assert_eq!(rows[1]["fix_duration"], 9);
    assert!(rows[1]["author_next_commit"].is_null());
}

#[test]
fn analyze_summary_goes_to_stderr_when_report_is_on_stdout() {
    let dir = TempDir::new().unwrap();
    write_log(dir.path());

    fixlag_cmd(dir.path())
        .args(["analyze", "snapshots.log", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("key\t"))
        .stderr(predicate::str::contains("records=3"));
}

#[test]
fn analyze_writes_bad_lines_file() {
    let dir = TempDir::new().unwrap();
    write_log(dir.path());

    fixlag_cmd(dir.path())
        .args([
            "analyze",
            "snapshots.log",
            "-o",
            "report.tsv",
            "--bad-lines",
            "bad.tsv",
            "--quiet",
        ])
        .assert()
        .success();

    let bad = std::fs::read_to_string(dir.path().join("bad.tsv")).unwrap();
    let lines: Vec<&str> = bad.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("6\tinvalid commit date"));
}

#[test]
fn project_config_sets_default_report_format() {
    let dir = TempDir::new().unwrap();
    write_log(dir.path());
    std::fs::write(
        dir.path().join("fixlag.toml"),
        "[report]\nformat = \"jsonl\"\n\n[analysis]\nparallel = true\n",
    )
    .unwrap();

    let output = fixlag_cmd(dir.path())
        .args(["analyze", "snapshots.log", "--quiet"])
        .output()
        .expect("analyze should not crash");
    assert!(output.status.success());
    let first = String::from_utf8(output.stdout).unwrap();
    let row: Value =
        serde_json::from_str(first.lines().next().expect("a row")).expect("JSONL row");
    assert_eq!(row["key"], "K1");
}

#[test]
fn broken_project_config_fails_with_code() {
    let dir = TempDir::new().unwrap();
    write_log(dir.path());
    std::fs::write(dir.path().join("fixlag.toml"), "[report\n").unwrap();

    fixlag_cmd(dir.path())
        .args(["analyze", "snapshots.log"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1002"));
}

#[test]
fn missing_input_fails_with_code() {
    let dir = TempDir::new().unwrap();

    let output = fixlag_cmd(dir.path())
        .args(["analyze", "missing.log", "--json"])
        .output()
        .expect("analyze should not crash");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("\"error_code\": \"E1001\""), "stderr: {stderr}");
}

#[test]
fn newer_log_version_is_fatal() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("future.log"),
        "# fixlag snapshot log v9\nalpha\tC1\t2024-01-01\t[]\n",
    )
    .unwrap();

    fixlag_cmd(dir.path())
        .args(["analyze", "future.log"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"));
}

// ---------------------------------------------------------------------------
// fixlag audit
// ---------------------------------------------------------------------------

#[test]
fn audit_reports_shared_keys() {
    let dir = TempDir::new().unwrap();
    write_log(dir.path());

    fixlag_cmd(dir.path())
        .args(["analyze", "snapshots.log", "-o", "report.tsv", "--quiet"])
        .assert()
        .success();

    let output = fixlag_cmd(dir.path())
        .args(["audit", "report.tsv", "--json"])
        .output()
        .expect("audit should not crash");
    assert!(output.status.success());

    let audit: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(audit["rows"], 3);
    assert_eq!(audit["samples"], serde_json::json!(["alpha", "beta"]));
    let dups = audit["duplicates"].as_array().expect("duplicates array");
    assert_eq!(dups.len(), 1);
    assert_eq!(dups[0]["key"], "K3");
    assert_eq!(
        dups[0]["differing"]["severity"],
        serde_json::json!(["MAJOR", "MINOR"])
    );
}

#[test]
fn audit_rejects_foreign_report() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("other.tsv"), "a\tb\n1\t2\n").unwrap();

    fixlag_cmd(dir.path())
        .args(["audit", "other.tsv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E3002"));
}
