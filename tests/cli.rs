use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/mysql")
        .join(name)
}

/// A chart directory laid out the way the default configuration expects.
fn chart_dir() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("templates")).unwrap();
    fs::create_dir_all(root.join("functionality_profiles/mysql")).unwrap();
    fs::copy(
        fixture("mysql_template.yaml"),
        root.join("templates/mysql_template.yaml"),
    )
    .unwrap();
    fs::copy(
        fixture("mysql_functionality.json"),
        root.join("functionality_profiles/mysql/mysql_functionality.json"),
    )
    .unwrap();
    fs::copy(
        fixture("checkov_results.json"),
        root.join("checkov_results.json"),
    )
    .unwrap();
    temp_dir
}

fn hardener(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("chart-hardener").unwrap();
    cmd.current_dir(dir)
        .env_remove("chart_folder")
        .env_remove("tool")
        .env_remove("first_tool")
        .env_remove("second_tool")
        .env_remove("iteration")
        .env_remove("resource_path")
        .env_remove("obj_path")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_mode_is_required() {
    let dir = chart_dir();
    hardener(dir.path()).assert().failure();
}

#[test]
fn test_check_plain_summary() {
    let dir = chart_dir();
    hardener(dir.path())
        .args(["--check", "--chart", "mysql", "--tool", "checkov"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Remediation"))
        .stdout(predicate::str::contains("CKV_K8S_20"))
        .stdout(predicate::str::contains("unmapped rule"));

    assert!(
        dir.path()
            .join("fixed_templates/mysql_checkov_fixed_template.yaml")
            .is_file()
    );
}

#[test]
fn test_selectors_from_environment() {
    let dir = chart_dir();
    hardener(dir.path())
        .env("chart_folder", "mysql")
        .env("first_tool", "checkov")
        .env("iteration", "1")
        .args(["--check", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_unknown_tool_is_an_error() {
    let dir = chart_dir();
    hardener(dir.path())
        .args(["--check", "--chart", "mysql", "--tool", "trivy"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_missing_profile_exits_non_zero() {
    let dir = chart_dir();
    fs::remove_dir_all(dir.path().join("functionality_profiles")).unwrap();
    hardener(dir.path())
        .args(["--check", "--chart", "mysql", "--tool", "checkov"])
        .assert()
        .success();
    hardener(dir.path())
        .args(["--add-func", "--chart", "mysql", "--first-tool", "checkov"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("mysql_functionality.json"));
}

#[test]
fn test_count_checks_json_with_malformed_tool() {
    let dir = chart_dir();
    fs::write(dir.path().join("kubescape_results.json"), "{ truncated").unwrap();

    let output = hardener(dir.path())
        .args([
            "--count-checks",
            "--second-tool",
            "checkov,kubescape",
            "--iteration",
            "1",
            "--format",
            "json",
        ])
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let summary: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(summary["reports"][0]["tool"], "checkov");
    assert_eq!(summary["reports"][0]["total"], 3);
    assert_eq!(summary["reports"][0]["status"], "fail");
    assert_eq!(summary["failures"][0]["kind"], "malformed_output");
    assert_eq!(summary["failures"][0]["tool"], "kubescape");
}

#[test]
fn test_config_file_threshold() {
    let dir = chart_dir();
    fs::write(
        dir.path().join(".chart-hardener.toml"),
        "[tally]\nseverity_floor = \"critical\"\nfail_on_findings = true\n",
    )
    .unwrap();

    hardener(dir.path())
        .args(["--count-checks", "--tool", "checkov"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS"));

    hardener(dir.path())
        .args(["--count-checks", "--tool", "checkov", "--severity-floor", "medium"])
        .assert()
        .code(1);
}

#[test]
fn test_summary_to_output_file() {
    let dir = chart_dir();
    hardener(dir.path())
        .args([
            "--count-checks",
            "--tool",
            "checkov",
            "--format",
            "json",
            "--output",
            "reports/tally.json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary saved to"));

    let saved = fs::read_to_string(dir.path().join("reports/tally.json")).unwrap();
    assert!(saved.contains("\"by_rule\""));
}

#[test]
fn test_docker_run_command() {
    let dir = chart_dir();
    hardener(dir.path())
        .args([
            "--docker-run",
            "--chart",
            "mysql",
            "--resource",
            "StatefulSet/default/mysql",
            "--container",
            "spec/template/spec/containers/0",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("docker run -d --name=mysql"))
        .stdout(predicate::str::contains("--user=1001"))
        .stdout(predicate::str::contains("docker.io/bitnami/mysql:8.0"));
}
