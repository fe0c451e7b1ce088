use assert_cmd::Command;
use predicates::prelude::*;

mod common;

#[test]
fn test_validate_matching_descriptor() {
    let ctx = common::TestContext::new();
    let descriptor = ctx.write_descriptor("task.xidml", &["X", "X", "X", "Y"]);

    ctx.cmd()
        .arg("validate")
        .arg(&descriptor)
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"))
        .stdout(predicate::str::contains("3x X"))
        .stdout(predicate::str::contains("1x Y"));
}

#[test]
fn test_validate_missing_instrument() {
    let ctx = common::TestContext::new();
    let descriptor = ctx.write_descriptor("task.xidml", &["X", "X", "X"]);

    ctx.cmd()
        .arg("validate")
        .arg(&descriptor)
        .assert()
        .failure()
        .stderr(predicate::str::contains("did not find Y"));
}

#[test]
fn test_validate_count_mismatch() {
    let ctx = common::TestContext::new();
    let descriptor = ctx.write_descriptor("task.xidml", &["X", "Y"]);

    ctx.cmd()
        .arg("validate")
        .arg(&descriptor)
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected 3 instance(s) of X"));
}

#[test]
fn test_validate_absent_file() {
    let ctx = common::TestContext::new();

    ctx.cmd()
        .arg("validate")
        .arg(ctx.dir.path().join("nothere.xidml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find expected task file"));
}

#[test]
fn test_missing_config_is_fatal() {
    Command::cargo_bin("autoprov")
        .unwrap()
        .args(["--config", "/no/such/autoprov.json", "validate", "x.xidml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading configuration"));
}
