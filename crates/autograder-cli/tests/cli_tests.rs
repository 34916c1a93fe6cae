//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ASSIGNMENT: &str = r#"
[assignment]
name = "HW1"

[[questions]]
name = "Layout"
kind = "files"
max_points = 4
required = ["README.md", "src/main.rs"]

[[questions]]
name = "Report"
kind = "files"
max_points = 2
required = ["REPORT.md"]
"#;

fn autograder(home: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("autograder").unwrap();
    cmd.current_dir(home).env("HOME", home).env_remove("RUST_LOG");
    cmd
}

/// Workspace with an assignment file and a submission missing `REPORT.md`.
fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("hw1.toml"), ASSIGNMENT).unwrap();

    let sub = dir.path().join("submission");
    std::fs::create_dir_all(sub.join("src")).unwrap();
    std::fs::write(sub.join("README.md"), "# hw1\n").unwrap();
    std::fs::write(sub.join("src/main.rs"), "fn main() {}\n").unwrap();
    dir
}

#[test]
fn validate_assignment_file() {
    let dir = fixture();
    autograder(dir.path())
        .args(["validate", "-a", "hw1.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Assignment: HW1 (2 questions, 6 points)"))
        .stdout(predicate::str::contains("Assignment valid."));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("dup.toml"),
        r#"
[assignment]
name = "Dup"

[[questions]]
name = "Same"
kind = "files"
max_points = 1
required = ["a"]

[[questions]]
name = "Same"
kind = "files"
max_points = 1
required = ["b"]
"#,
    )
    .unwrap();

    autograder(dir.path())
        .args(["validate", "--assignment", "dup.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("duplicate question name: Same"))
        .stdout(predicate::str::contains("1 warning(s) found."));
}

#[test]
fn validate_nonexistent_file() {
    let dir = TempDir::new().unwrap();
    autograder(dir.path())
        .args(["validate", "-a", "nonexistent.toml"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn validate_unknown_kind() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("bad.toml"),
        "[assignment]\nname = \"Bad\"\n\n[[questions]]\nname = \"Q\"\nkind = \"lint\"\nmax_points = 1\n",
    )
    .unwrap();

    autograder(dir.path())
        .args(["validate", "-a", "bad.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown question kind 'lint'"));
}

#[test]
fn grade_writes_json_and_transcript() {
    let dir = fixture();

    autograder(dir.path())
        .args([
            "grade",
            "-a",
            "hw1.toml",
            "-s",
            "submission",
            "-o",
            "out/result.json",
            "--prefix",
            "Q",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Autograder transcript for project: HW1."))
        .stdout(predicate::str::contains("Q Layout: 4 / 4"))
        .stdout(predicate::str::contains("Q Report: 0 / 2"))
        .stdout(predicate::str::contains("   Missing file: REPORT.md"))
        .stdout(predicate::str::contains("Total: 4 / 6"))
        .stderr(predicate::str::contains("Grading HW1 (2 questions) against"));

    let json = std::fs::read_to_string(dir.path().join("out/result.json")).unwrap();
    let record: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(record["name"], "HW1");
    assert_eq!(record["questions"][0]["score"], 4);
    assert_eq!(record["questions"][1]["timeout"], 60);
    assert!(record["start"].as_str().unwrap().ends_with('Z'));
}

#[test]
fn grade_writes_html() {
    let dir = fixture();

    autograder(dir.path())
        .args(["grade", "-a", "hw1.toml", "-s", "submission", "--html", "report.html"])
        .assert()
        .success();

    let html = std::fs::read_to_string(dir.path().join("report.html")).unwrap();
    assert!(html.contains("Total: <strong>4 / 6</strong>"));
}

#[test]
fn grade_uses_config_file() {
    let dir = fixture();
    std::fs::write(
        dir.path().join("custom.toml"),
        "default_timeout_secs = 7\nquestion_prefix = \"Part\"\n",
    )
    .unwrap();

    autograder(dir.path())
        .args([
            "grade",
            "-a",
            "hw1.toml",
            "-s",
            "submission",
            "-o",
            "result.json",
            "--config",
            "custom.toml",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Part Layout: 4 / 4"));

    let json = std::fs::read_to_string(dir.path().join("result.json")).unwrap();
    let record: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(record["questions"][0]["timeout"], 7);
}

#[test]
fn grade_missing_submission_fails() {
    let dir = fixture();
    autograder(dir.path())
        .args(["grade", "-a", "hw1.toml", "-s", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("submission not found"));
}

#[test]
fn show_rerenders_saved_result() {
    let dir = fixture();
    autograder(dir.path())
        .args(["grade", "-a", "hw1.toml", "-s", "submission", "-o", "result.json"])
        .assert()
        .success();

    autograder(dir.path())
        .args(["show", "result.json", "--prefix", "Problem"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Problem Report: 0 / 2"))
        .stdout(predicate::str::contains("Total: 4 / 6"));
}

#[test]
fn show_rejects_malformed_json() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    autograder(dir.path())
        .args(["show", "broken.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse result JSON"));
}
