//! `recon config-hash` and config loading at the process boundary.
//!
//! No DB required: config-hash never connects.

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

#[allow(deprecated)]
fn recon() -> Command {
    let mut cmd = Command::cargo_bin("recon").expect("recon binary");
    cmd.env_remove("RECON_DATABASE_URL")
        .env_remove("RECON_DB_NAME")
        .env("RUST_LOG", "warn");
    cmd
}

fn hash_line(stdout: &[u8]) -> String {
    String::from_utf8_lossy(stdout)
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}

#[test]
fn config_hash_is_stable_across_invocations() {
    let run = || {
        recon()
            .args(["config-hash", "--config", &fixture("base.yaml")])
            .args(["--config", &fixture("fast_scheduler.yaml")])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone()
    };

    let a = run();
    let b = run();
    assert_eq!(a, b);

    let line = hash_line(&a);
    let hash = line.strip_prefix("config_hash=").expect("config_hash line first");
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn layer_order_changes_the_hash() {
    let forward = recon()
        .args(["config-hash", "--config", &fixture("base.yaml")])
        .args(["--config", &fixture("fast_scheduler.yaml")])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let reversed = recon()
        .args(["config-hash", "--config", &fixture("fast_scheduler.yaml")])
        .args(["--config", &fixture("base.yaml")])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_ne!(hash_line(&forward), hash_line(&reversed));
}

#[test]
fn no_config_uses_defaults() {
    recon()
        .arg("config-hash")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("config_hash="))
        .stdout(predicate::str::contains("{}"));
}

#[test]
fn password_in_yaml_is_rejected_and_redacted() {
    recon()
        .args(["config-hash", "--config", &fixture("with_password.yaml")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("hunter2").not());
}

#[test]
fn unknown_key_warns_by_default_and_fails_when_strict() {
    recon()
        .args(["config-hash", "--config", &fixture("unknown_key.yaml")])
        .assert()
        .success();

    recon()
        .args(["--strict-config", "config-hash", "--config", &fixture("unknown_key.yaml")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_UNUSED_KEYS"))
        .stderr(predicate::str::contains("/engine/match_tolerance"));
}

#[test]
fn zero_interval_is_refused() {
    recon()
        .args(["config-hash", "--config", &fixture("zero_interval.yaml")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("scheduler.interval_secs must be > 0"));
}
