//! CLI behavior: flags, exit codes and the error stream.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn provisions_the_default_layout() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("ca");

    Command::cargo_bin("tapcert")
        .unwrap()
        .args(["--domain", "example.com", "--dir"])
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("All certificates generated"));

    assert!(dir.join("ca.crt").is_file());
    assert!(dir.join("ca.key").is_file());
    assert!(dir.join("example.com.crt").is_file());
    assert!(dir.join("example.com.key").is_file());
    assert!(dir.join("openssl.cnf").is_file());
}

#[test]
fn json_mode_emits_a_parseable_summary() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("ca");

    let output = Command::cargo_bin("tapcert")
        .unwrap()
        .args(["--domain", "one.test", "--json", "--dir"])
        .arg(&dir)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(summary["domain"], "one.test");
    assert_eq!(summary["leaf"]["subject"], "one.test");
    assert_eq!(summary["ca"]["subject"], summary["ca"]["issuer"]);
}

#[test]
fn fatal_errors_land_on_stderr_with_exit_code_one() {
    let tmp = tempfile::tempdir().unwrap();
    // a plain file where the storage directory should go
    let blocker = tmp.path().join("ca");
    std::fs::write(&blocker, "not a directory").unwrap();

    Command::cargo_bin("tapcert")
        .unwrap()
        .args(["--domain", "example.com", "--dir"])
        .arg(&blocker)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn help_documents_the_ca_rotation_behavior() {
    Command::cargo_bin("tapcert")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("rotates the CA"));
}
