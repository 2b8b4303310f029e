use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const MANIFEST: &str = r#"
project "cli-demo"

stack "vpc" {
    template "templates/vpc.yaml"
    param "CidrBlock" "10.0.0.0/16"
}

stack "cluster" {
    template "templates/cluster.yaml"
    depends-on "vpc"
}
"#;

fn write_manifest(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("stacks.kdl");
    fs::write(&path, MANIFEST).unwrap();
    path
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("teardown"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stackflow"));
}

#[test]
fn test_validate_accepts_good_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(&dir);

    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.arg("--manifest")
        .arg(&manifest)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("cli-demo"))
        .stdout(predicate::str::contains("manifest is valid"));
}

#[test]
fn test_validate_rejects_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stacks.kdl");
    fs::write(
        &path,
        r#"
        project "bad"
        stack "a" {
            template "t/a.yaml"
            depends-on "b"
        }
        stack "b" {
            template "t/b.yaml"
            depends-on "a"
        }
        "#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.arg("--manifest")
        .arg(&path)
        .arg("validate")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("cycle"));
}

#[test]
fn test_missing_manifest_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("STACKFLOW_MANIFEST")
        .arg("validate")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("no manifest found"));
}

#[test]
fn test_teardown_with_wrong_token_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(&dir);

    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.arg("--manifest")
        .arg(&manifest)
        .arg("teardown")
        .arg("--confirm")
        .arg("not-the-project")
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::contains("aborted"));
}

#[test]
fn test_invalid_command_fails() {
    let mut cmd = Command::cargo_bin("stackflow").unwrap();
    cmd.arg("frobnicate").assert().failure();
}
