use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn recon() -> Command {
    Command::cargo_bin("recon").expect("recon binary")
}

#[test]
fn help_lists_every_mode() {
    let assert = recon().arg("--help").assert().success();
    let out = String::from_utf8_lossy(&assert.get_output().stdout).to_string();

    for cmd in ["recon", "pass", "migrate", "seed", "status", "config-hash"] {
        assert!(out.contains(cmd), "help must list `{cmd}`:\n{out}");
    }
    assert!(out.contains("--db-name"));
    assert!(out.contains("--database-url"));
}

#[test]
fn unknown_mode_exits_non_zero() {
    recon()
        .arg("reconcile-everything")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
