use predicates::prelude::*;

mod common;

// The daemon drains stdin events and exits once the source closes, so
// these run without root, udev, or real media.

#[cfg(target_os = "linux")]
#[test]
fn test_run_ignores_filtered_events_and_exits_on_eof() {
    let ctx = common::TestContext::new();

    ctx.cmd()
        .args(["run", "--events", "stdin"])
        .write_stdin(concat!(
            r#"{"action": "add", "device_path": "/dev/sdb1", "fs_type": "ext4", "device_kind": "partition"}"#,
            "\n",
            r#"{"action": "add", "device_path": "/dev/sdb", "fs_type": "vfat", "device_kind": "disk"}"#,
            "\n",
        ))
        .assert()
        .success();
}

#[cfg(target_os = "linux")]
#[test]
fn test_run_skips_malformed_event_lines() {
    let ctx = common::TestContext::new();

    ctx.cmd()
        .args(["run", "--events", "stdin"])
        .write_stdin("this is not json\n")
        .assert()
        .success();
}

#[test]
fn test_report_sends_and_exits() {
    let ctx = common::TestContext::new();

    ctx.cmd()
        .args(["report", "channel check"])
        .assert()
        .success();
}

#[test]
fn test_help_lists_subcommands() {
    let ctx = common::TestContext::new();

    ctx.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("report"));
}
