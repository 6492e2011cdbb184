use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_lists_the_traffic_flags() {
    Command::cargo_bin("loadgen")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--target")
                .and(predicate::str::contains("--duration"))
                .and(predicate::str::contains("--workers")),
        );
}

#[test]
fn test_a_malformed_duration_is_refused() {
    Command::cargo_bin("loadgen")
        .unwrap()
        .args(["--duration", "soon"])
        .assert()
        .failure();
}

#[test]
fn test_version_flag_prints_and_exits() {
    Command::cargo_bin("loadgen")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("loadgen"));
}
