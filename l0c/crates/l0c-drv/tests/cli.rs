//! Smoke tests for the `l0c` binary.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_no_arguments_prints_usage() {
    Command::cargo_bin("l0c")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("usage: l0c"));
}

#[test]
fn test_unknown_flag_is_rejected() {
    Command::cargo_bin("l0c")
        .unwrap()
        .args(["app", "--frobnicate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown flag"));
}

#[test]
fn test_compiles_to_stdout() {
    let dir = tempfile::TempDir::new().unwrap();
    fs::write(
        dir.path().join("app.l0"),
        "module app;\nfunc main() -> int { return 14; }\n",
    )
    .unwrap();

    Command::cargo_bin("l0c")
        .unwrap()
        .args(["app", "-p", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("l0_app_main"))
        .stdout(predicate::str::contains("#include \"l0_runtime.h\""));
}

#[test]
fn test_writes_output_file_and_runtime_header() {
    let dir = tempfile::TempDir::new().unwrap();
    fs::write(
        dir.path().join("app.l0"),
        "module app;\nfunc main() -> int { return 0; }\n",
    )
    .unwrap();
    let out = tempfile::TempDir::new().unwrap();
    let out_file = out.path().join("app.c");

    Command::cargo_bin("l0c")
        .unwrap()
        .args([
            "app",
            "-p",
            dir.path().to_str().unwrap(),
            "-o",
            out_file.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert!(out_file.is_file());
    assert!(out.path().join("l0_runtime.h").is_file());
}

#[test]
fn test_type_error_exits_nonzero_with_code() {
    let dir = tempfile::TempDir::new().unwrap();
    fs::write(
        dir.path().join("app.l0"),
        "module app;\nfunc main() -> int { return true; }\n",
    )
    .unwrap();

    Command::cargo_bin("l0c")
        .unwrap()
        .args(["app", "-p", dir.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("TYP-0016"));
}

#[test]
fn test_trace_flags_reach_output() {
    let dir = tempfile::TempDir::new().unwrap();
    fs::write(
        dir.path().join("app.l0"),
        "module app;\nfunc main() -> int { return 0; }\n",
    )
    .unwrap();

    Command::cargo_bin("l0c")
        .unwrap()
        .args(["app", "-p", dir.path().to_str().unwrap(), "--trace-arc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#define L0_TRACE_ARC 1"));
}
