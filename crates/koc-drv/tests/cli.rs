//! End-to-end tests of the `koc` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn koc() -> Command {
    Command::cargo_bin("koc").unwrap()
}

#[test]
fn test_no_args_prints_help() {
    koc()
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_version_flag() {
    koc()
        .arg("-v")
        .assert()
        .success()
        .stdout(predicate::str::contains("koc version"));
}

#[test]
fn test_missing_input_fails() {
    koc()
        .args(["build", "bin", "does-not-exist.k"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("input file not found"));
}

#[test]
fn test_invalid_flag_fails() {
    koc()
        .args(["build", "bogus-kind", "main.k"])
        .assert()
        .failure();
}

#[test]
fn test_build_clean_project() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("main.k"), "const A : u8 = 1;\n").unwrap();

    koc()
        .args(["build", "bin"])
        .arg(dir.path().join("main.k"))
        .assert()
        .success();
}

#[test]
fn test_build_with_error_exits_one() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("main.k"), "const X : u8 = 256;\n").unwrap();

    koc()
        .args(["build", "bin"])
        .arg(dir.path().join("main.k"))
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_kir_dump() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("main.k"), "const A : u8 = 1;\n").unwrap();

    koc()
        .arg("kir")
        .arg(dir.path().join("main.k"))
        .assert()
        .success()
        .stdout(predicate::str::contains("as(@u8, @one)"));
}
